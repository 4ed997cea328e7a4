use carprice::feature_engineering::FeatureEngineer;
use carprice::ingestion::{train_test_split, validate_schema};
use carprice::pipeline::DataTransformation;
use carprice::preprocessing::{ColumnSpec, DataPreprocessor};
use carprice::training::{default_candidates, split_features_target, Regressor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const COMPANIES: [&str; 6] = ["Maruti", "Hyundai", "Honda", "Toyota", "Mahindra", "Tata"];
const FUELS: [&str; 3] = ["Petrol", "Diesel", "LPG"];

fn create_car_data(n_rows: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let mut names = Vec::with_capacity(n_rows);
    let mut companies = Vec::with_capacity(n_rows);
    let mut fuels = Vec::with_capacity(n_rows);
    let mut years = Vec::with_capacity(n_rows);
    let mut kms = Vec::with_capacity(n_rows);
    let mut prices = Vec::with_capacity(n_rows);

    for _ in 0..n_rows {
        let c = rng.gen_range(0..COMPANIES.len());
        let model = rng.gen_range(0..5);
        let year: f64 = rng.gen_range(2000..2024) as f64;
        let km: f64 = rng.gen_range(1_000.0..150_000.0);
        let base = 300_000.0 * (1.0 + c as f64 * 0.4) * (1.0 + model as f64 * 0.1);

        names.push(format!("{} Model {}", COMPANIES[c], model));
        companies.push(COMPANIES[c]);
        fuels.push(FUELS[rng.gen_range(0..FUELS.len())]);
        years.push(year);
        kms.push(km);
        prices.push(base * 0.9f64.powf(2025.0 - year) - km * 0.3 + rng.gen::<f64>() * 10_000.0);
    }

    df!(
        "name" => names,
        "company" => companies,
        "year" => years,
        "Price" => prices,
        "kms_driven" => kms,
        "fuel_type" => fuels
    )
    .unwrap()
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");

    for n_rows in [1000, 5000].iter() {
        let raw = validate_schema(&create_car_data(*n_rows)).unwrap();
        let engineered = FeatureEngineer::new(2025).transform(&raw).unwrap();

        group.bench_with_input(BenchmarkId::new("fit_transform", n_rows), &engineered, |b, df| {
            b.iter(|| {
                let mut preprocessor = DataPreprocessor::new(ColumnSpec::default());
                preprocessor.fit_transform(black_box(df)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let raw = validate_schema(&create_car_data(1000)).unwrap();
    let (train, test) = train_test_split(&raw, 0.2, 42).unwrap();
    let data = DataTransformation::new(2025)
        .initiate_data_transformation(&train, &test)
        .unwrap();
    let (x, y) = split_features_target(&data.train_arr).unwrap();

    for candidate in default_candidates(42) {
        group.bench_function(BenchmarkId::new("fit", &candidate.name), |b| {
            b.iter(|| {
                let mut model = candidate.estimator.clone();
                model.fit(black_box(&x), black_box(&y)).unwrap();
                model
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_preprocessing, bench_candidates);
criterion_main!(benches);
