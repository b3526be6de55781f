use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use zhome_core::{DriftModel, WindowBuffer};

// Positions that drift by 18 mm per move with a small alternating jitter.
fn synth_positions(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            18.0 * i as f64 + sign * 0.05 / (1.0 + i as f64)
        })
        .collect()
}

pub fn bench_window(c: &mut Criterion) {
    let positions = synth_positions(1024);
    let drift = DriftModel::default();

    for cap in [4usize, 16, 64] {
        c.bench_function(&format!("window_push_range_cap{cap}"), |b| {
            b.iter_batched(
                || WindowBuffer::new(cap).unwrap(),
                |mut w| {
                    let mut acc = 0.0;
                    for &p in &positions {
                        w.push(p);
                        if let Ok(r) = w.range() {
                            acc += (r - drift.expected_window_spread(0.0)).abs();
                        }
                    }
                    black_box(acc)
                },
                BatchSize::SmallInput,
            );
        });
    }
}

criterion_group!(benches, bench_window);
criterion_main!(benches);
