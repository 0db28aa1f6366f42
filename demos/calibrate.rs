//! Run a calibration on synthetic measurements
//!
//! Publishes two sessions to a JSON session file and writes the report
//! for the latest one.
//!
//! Usage: calibrate [output_dir] [config.json]

use std::{
    env,
    path::{Path, PathBuf},
    process,
};

use chrono::{Duration, Utc};
use display_calib::engine::{ColorPatches, MuraSamples};
use display_calib::persistence::JsonFileStore;
use display_calib::{CalibrationEngine, EngineConfig, MeasurementSet};
use tracing::info;

fn synthetic_measurements(gamma: f64, days_ago: i64) -> MeasurementSet {
    let luminance = (0..64)
        .map(|i| {
            let s = i as f64 / 63.0;
            [s, s.powf(gamma)]
        })
        .collect();

    let target = vec![
        [0.80, 0.20, 0.15],
        [0.25, 0.70, 0.20],
        [0.15, 0.20, 0.75],
        [0.50, 0.50, 0.50],
        [0.90, 0.85, 0.30],
        [0.35, 0.60, 0.80],
    ];
    let measured = target
        .iter()
        .map(|&[r, g, b]: &[f64; 3]| [0.94 * r + 0.03 * g, 0.02 * r + 0.96 * g, 0.91 * b])
        .collect();

    let samples = (0..5)
        .flat_map(|j| {
            (0..8).map(move |i| {
                let (x, y) = (i as f64 * 274.0, j as f64 * 270.0);
                let falloff = ((x - 960.0).powi(2) + (y - 540.0).powi(2)).sqrt() / 1100.0;
                [x, y, 120.0 * (1.0 - 0.15 * falloff)]
            })
        })
        .collect();

    MeasurementSet {
        device_id: "DISPLAY_SN_ABC123".to_string(),
        session_name: format!("synthetic-gamma-{gamma:.2}"),
        captured_at: Some(Utc::now() - Duration::days(days_ago)),
        luminance,
        color_patches: Some(ColorPatches { measured, target }),
        white_patch: Some([0.96, 1.0, 0.88]),
        mura: Some(MuraSamples {
            samples,
            width: 1920,
            height: 1080,
        }),
        primaries: Some([[0.95, 0.05, 0.02], [0.08, 0.9, 0.06], [0.03, 0.07, 0.93]]),
        lens_target: None,
    }
}

fn run(output_dir: PathBuf, config: EngineConfig) -> display_calib::Result<()> {
    std::fs::create_dir_all(&output_dir)?;
    let store = JsonFileStore::new(output_dir.join("calibration_sessions.json"));
    let engine = CalibrationEngine::new(config)?;

    let mut latest = None;
    for (gamma, days_ago) in [(2.2, 30), (2.38, 0)] {
        let calibration = engine.run(&synthetic_measurements(gamma, days_ago))?;
        let calibration = engine.publish(calibration, &store);
        for warning in &calibration.warnings {
            eprintln!("  warning: {}", warning);
        }
        info!(
            session = %calibration.session.session_name,
            gamma = calibration.session.tone_curve.gamma(),
            "Session published"
        );
        latest = Some(calibration);
    }

    if let Some(calibration) = latest {
        let report = engine.report(&calibration, &store)?;
        let report_path = output_dir.join("calibration_report.json");
        report.write_json_file(&report_path)?;

        println!("Report written to {}", report_path.display());
        println!("  Gamma: {:.3}", report.gamma_statistics.latest_gamma);
        for (name, coverage) in &report.gamut_coverage {
            println!("  {} coverage: {:.2}%", name, coverage);
        }
        println!("  Recommendation: {}", report.trend_analysis.recommendation());
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let output_dir = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("calibration_output"));

    let config = match args.get(2) {
        Some(path) => match EngineConfig::from_json_file(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {}", e.user_message());
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    if let Err(e) = run(output_dir, config) {
        eprintln!("Calibration failed: {}", e.user_message());
        process::exit(1);
    }
}
