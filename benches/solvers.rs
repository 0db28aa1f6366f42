use criterion::{black_box, criterion_group, criterion_main, Criterion};
use display_calib::calculate_gamut_coverage;
use display_calib::calibration::{CcmSolver, GammaSolver, MuraMapBuilder};

fn tone_samples(n: usize, gamma: f64) -> Vec<[f64; 2]> {
    (0..n)
        .map(|i| {
            let s = i as f64 / (n - 1) as f64;
            [s, s.powf(gamma)]
        })
        .collect()
}

fn benchmark_gamma(c: &mut Criterion) {
    let samples = tone_samples(256, 2.4);
    let solver = GammaSolver::default();
    c.bench_function("gamma_solve_256", |b| {
        b.iter(|| solver.solve(black_box(&samples)))
    });
}

fn benchmark_ccm(c: &mut Criterion) {
    let target: Vec<[f64; 3]> = (0..24)
        .map(|i| {
            let t = i as f64 / 23.0;
            [t, (1.0 - t) * 0.8, 0.2 + 0.6 * t * t]
        })
        .collect();
    let measured: Vec<[f64; 3]> = target
        .iter()
        .map(|&[r, g, b]| [0.92 * r + 0.05 * g, 0.03 * r + 0.95 * g, 0.9 * b + 0.04 * g])
        .collect();
    let solver: CcmSolver = CcmSolver::default();
    c.bench_function("ccm_solve_24_patches", |b| {
        b.iter(|| solver.solve(black_box(&measured), black_box(&target)))
    });
}

fn benchmark_mura(c: &mut Criterion) {
    let samples: Vec<[f64; 3]> = (0..9)
        .flat_map(|j| {
            (0..16).map(move |i| {
                let (x, y) = (i as f64 * 127.0, j as f64 * 134.0);
                [x, y, 100.0 - ((x - 960.0).powi(2) + (y - 540.0).powi(2)).sqrt() * 0.01]
            })
        })
        .collect();
    let builder = MuraMapBuilder::default();
    c.bench_function("mura_build_1920x1080", |b| {
        b.iter(|| builder.build(black_box(&samples), 1920, 1080))
    });
}

fn benchmark_gamut(c: &mut Criterion) {
    let primaries = [[0.95, 0.05, 0.02], [0.08, 0.9, 0.06], [0.03, 0.07, 0.93]];
    c.bench_function("gamut_coverage", |b| {
        b.iter(|| calculate_gamut_coverage(black_box(&primaries)))
    });
}

criterion_group!(
    benches,
    benchmark_gamma,
    benchmark_ccm,
    benchmark_mura,
    benchmark_gamut
);
criterion_main!(benches);
