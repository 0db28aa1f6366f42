//! Generate a default engine configuration file
//!
//! Creates a JSON config with all default solver and drift parameters

use display_calib::EngineConfig;
use std::{env, path::Path, process};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <output_config.json>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} config/calibration.json", args[0]);
        process::exit(1);
    }

    let output_path = Path::new(&args[1]);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            process::exit(1);
        }
    }

    let config = EngineConfig::default();

    match config.to_json_file(output_path) {
        Ok(_) => {
            eprintln!("Configuration saved to {}", output_path.display());
            eprintln!();
            eprintln!("Config summary:");
            eprintln!(
                "  Gamma fit: initial {:.1}, up to {} iterations",
                config.gamma.initial_gamma, config.gamma.max_iterations
            );
            eprintln!(
                "  CCM fit: tolerance {:e}, up to {} iterations",
                config.ccm.tolerance, config.ccm.max_iterations
            );
            eprintln!(
                "  Mura factors: {:.2}-{:.2}",
                config.mura.min_factor, config.mura.max_factor
            );
            eprintln!(
                "  Drift thresholds: gamma {:.2}, ΔE {:.1}, gamut {:.1}%",
                config.drift.gamma, config.drift.delta_e, config.drift.gamut_coverage
            );
            eprintln!("  Sessions: {}", config.persistence.path.display());
        }
        Err(e) => {
            eprintln!("Error saving config: {}", e);
            process::exit(1);
        }
    }
}
