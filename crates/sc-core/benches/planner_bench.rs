// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Planner and Parameterizer Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, Criterion};
use sc_core::parameterizer::parameterize;
use sc_core::planner::plan;
use sc_types::state::{BeamParams, KickElement, KickMode, OpticsSample};
use std::hint::black_box;

/// SPS-sized ring with an element every ~3.2 m.
fn element_positions(n: usize, length: f64) -> Vec<f64> {
    (0..n)
        .map(|i| (i as f64 + 0.37 * ((i * 7) % 11) as f64 / 11.0) * length / n as f64)
        .collect()
}

fn bench_plan(c: &mut Criterion) {
    let length = 6911.5;
    let elements = element_positions(2160, length);
    let mut group = c.benchmark_group("kick_plan");

    for &kicks in &[100usize, 800, 4000] {
        let label = format!("{}elements_{}kicks", elements.len(), kicks);
        group.bench_function(&label, |b| {
            b.iter(|| {
                let p = plan(length, &elements, kicks, 1.5).expect("plan should succeed");
                black_box(p.slots[kicks / 2].position);
            })
        });
    }

    group.finish();
}

fn bench_parameterize(c: &mut Criterion) {
    let n = 800;
    let beam = BeamParams {
        intensity: 2e11,
        emittance_x: 2e-6,
        emittance_y: 2e-6,
        momentum_spread_rms: 1.5e-3,
        bunch_length_rms: 0.22,
        beta_gamma: 27.6,
    };
    let optics: Vec<OpticsSample> = (0..n)
        .map(|i| OpticsSample {
            name: format!("sc{i}"),
            s: i as f64 * 8.6,
            beta_x: 20.0 + 80.0 * (i as f64 * 0.1).sin().abs(),
            beta_y: 20.0 + 80.0 * (i as f64 * 0.1).cos().abs(),
            dispersion_x: 2.0 * (i as f64 * 0.05).sin(),
            dispersion_y: 0.0,
            x: 0.0,
            y: 0.0,
        })
        .collect();
    let lengths = vec![8.6; n];

    c.bench_function("parameterize_800_kicks", |b| {
        b.iter(|| {
            let mut owned: Vec<KickElement> = (0..n)
                .map(|i| KickElement::new(format!("sc{i}"), KickMode::Bunched))
                .collect();
            let mut kicks: Vec<&mut KickElement> = owned.iter_mut().collect();
            parameterize(&mut kicks, &lengths, &optics, &beam)
                .expect("parameterize should succeed");
            black_box(owned[n / 2].sigma_x);
        })
    });
}

criterion_group!(benches, bench_plan, bench_parameterize);
criterion_main!(benches);
