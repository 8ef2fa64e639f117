//! Benchmarks for the linear fit, residual training and closed-loop prediction.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wavecast::config::ResidualHyperparameters;
use wavecast::core::TimeSeries;
use wavecast::models::arimax::{ArimaxOrder, FittedArimax};
use wavecast::models::lstm::{predict_iterative, LstmNetwork, ResidualTrainer};
use wavecast::transform::MinMaxScaler;

fn sea_state(n: usize) -> TimeSeries {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let timestamps = (0..n).map(|i| base + Duration::hours(i as i64)).collect();
    let wind: Vec<f64> = (0..n)
        .map(|i| 8.0 + 3.0 * (i as f64 * 0.1).sin() + 0.4 * (i as f64 * 0.73).cos())
        .collect();
    let wave = wind
        .iter()
        .enumerate()
        .map(|(i, w)| 0.6 + 0.2 * w + 0.05 * (i as f64 * 1.7).sin())
        .collect();
    TimeSeries::new(timestamps, wave, wind).unwrap()
}

fn bench_arimax_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("arimax_fit");
    group.sample_size(20);

    for size in [200, 1000] {
        let series = sea_state(size);
        for order in [ArimaxOrder::new(1, 0, 0), ArimaxOrder::new(2, 1, 1)] {
            group.bench_with_input(
                BenchmarkId::new(order.to_string(), size),
                &series,
                |b, s| b.iter(|| black_box(FittedArimax::fit(s, order).unwrap())),
            );
        }
    }
    group.finish();
}

fn bench_residual_training(c: &mut Criterion) {
    let series = sea_state(500);
    let residuals = FittedArimax::fit(&series, ArimaxOrder::new(1, 0, 0))
        .unwrap()
        .residuals();
    let mut group = c.benchmark_group("residual_training");
    group.sample_size(10);

    for hidden in [8, 18] {
        let hp = ResidualHyperparameters::default()
            .with_hidden_units(hidden)
            .with_epochs(5, 5);
        group.bench_with_input(BenchmarkId::new("5_epochs", hidden), &hp, |b, hp| {
            b.iter(|| black_box(ResidualTrainer::new(hp.clone(), 42).train(&residuals, None).unwrap()))
        });
    }
    group.finish();
}

fn bench_predict_iterative(c: &mut Criterion) {
    let window = 12;
    let network = LstmNetwork::new(18, &mut StdRng::seed_from_u64(42));
    let scaler = MinMaxScaler::fit(&[-1.0, 1.0]).unwrap();
    let seed: Vec<f64> = (0..window).map(|i| 0.5 + 0.1 * (i as f64).sin()).collect();
    let mut group = c.benchmark_group("predict_iterative");

    for steps in [24, 240, 2400] {
        group.bench_with_input(BenchmarkId::new("steps", steps), &steps, |b, &n| {
            b.iter(|| black_box(predict_iterative(&network, &scaler, &seed, n, window).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_arimax_fit,
    bench_residual_training,
    bench_predict_iterative,
);
criterion_main!(benches);
