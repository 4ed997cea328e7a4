//! Integration test: artifact persistence round trips

mod common;

use carprice::artifacts::{ArtifactKey, ArtifactStore, FileArtifactStore};
use carprice::feature_engineering::FeatureEngineer;
use carprice::ingestion::validate_schema;
use carprice::preprocessing::{ColumnSpec, DataPreprocessor};
use carprice::training::{default_candidates, split_features_target, RegressionModel, Regressor};
use carprice::CarPriceError;
use ndarray::{concatenate, Axis};
use polars::prelude::*;

fn engineered(n: usize) -> DataFrame {
    let raw = validate_schema(&common::car_table(n)).unwrap();
    FeatureEngineer::new(2025).transform(&raw).unwrap()
}

#[test]
fn test_preprocessor_round_trip() {
    let df = engineered(48);
    let mut preprocessor = DataPreprocessor::new(ColumnSpec::default());
    let expected = preprocessor.fit_transform(&df).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path());
    store.save(ArtifactKey::Preprocessor, &preprocessor).unwrap();
    assert!(dir.path().join("preprocessor.bin").is_file());

    let loaded: DataPreprocessor = store.load(ArtifactKey::Preprocessor).unwrap();
    assert_eq!(loaded.transform(&df).unwrap(), expected);
    assert_eq!(loaded.feature_names().unwrap(), preprocessor.feature_names().unwrap());
}

#[test]
fn test_every_default_model_round_trips() {
    let df = engineered(60);
    let mut preprocessor = DataPreprocessor::new(ColumnSpec::default());
    let x = preprocessor.fit_transform(&df).unwrap();
    let y = df
        .column("Price")
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect::<ndarray::Array1<f64>>();
    let arr = concatenate(Axis(1), &[x.view(), y.view().insert_axis(Axis(1))]).unwrap();
    let (x, y) = split_features_target(&arr).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path());

    for candidate in default_candidates(42) {
        let mut model = candidate.estimator;
        model.fit(&x, &y).unwrap();
        let expected = model.predict(&x).unwrap();

        store.save(ArtifactKey::Model, &model).unwrap();
        let loaded: RegressionModel = store.load(ArtifactKey::Model).unwrap();

        assert_eq!(loaded.kind(), model.kind(), "{}", candidate.name);
        assert_eq!(loaded.n_features_in(), model.n_features_in());
        assert_eq!(loaded.predict(&x).unwrap(), expected, "{}", candidate.name);
    }
}

#[test]
fn test_missing_model_reported_by_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path());

    match store.load::<RegressionModel>(ArtifactKey::Model) {
        Err(CarPriceError::ArtifactNotFound { key, path }) => {
            assert_eq!(key, "model");
            assert!(path.ends_with("model.bin"));
        }
        other => panic!("expected ArtifactNotFound, got {:?}", other.map(|m| m.kind())),
    }
}

#[test]
fn test_truncated_artifact_is_corrupt() {
    let df = engineered(24);
    let mut preprocessor = DataPreprocessor::new(ColumnSpec::default());
    preprocessor.fit(&df).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path());
    store.save(ArtifactKey::Preprocessor, &preprocessor).unwrap();

    let path = store.path_for(ArtifactKey::Preprocessor);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let result: carprice::Result<DataPreprocessor> = store.load(ArtifactKey::Preprocessor);
    assert!(matches!(result, Err(CarPriceError::ArtifactCorrupt { .. })));
}
