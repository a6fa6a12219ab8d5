use agro_core::{CropProfile, EnvField};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_forecast(c: &mut Criterion) {
    let profile = CropProfile::olive();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let history = agro_sim::generate_history(2000..=2024, 25.0, &profile, &mut rng).unwrap();
    let params = agro_forecast::ForecastParams {
        horizon: 10,
        instability_factor: 0.1,
    };
    c.bench_function("forecast 25y history x 10y horizon", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let _ = black_box(agro_forecast::forecast(
                &history.environment,
                &history.production,
                params,
                &mut rng,
            ));
        })
    });

    let forecast = agro_forecast::forecast_seeded(&history.environment, &history.production, params, 7).unwrap();
    let next = forecast.earliest_year_slice();
    let over = agro_forecast::EnvOverride {
        field: EnvField::Temperature,
        value: 32.0,
    };
    c.bench_function("override next year", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let _ = black_box(agro_forecast::recompute_with_override(
                &next, over, 25.0, &profile, &mut rng,
            ));
        })
    });
}

criterion_group!(benches, bench_forecast);
criterion_main!(benches);
