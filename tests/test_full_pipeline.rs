//! Integration test: training run through to single predictions

mod common;

use carprice::artifacts::{ArtifactKey, ArtifactStore, FileArtifactStore};
use carprice::config::AppConfig;
use carprice::feature_engineering::FeatureEngineer;
use carprice::inference::{CarInput, PredictionService};
use carprice::ingestion::InMemoryProvider;
use carprice::pipeline::TrainingPipeline;
use carprice::training::Candidate;
use carprice::{CarPriceError, Stage};
use common::MeanModel;

fn swift() -> CarInput {
    CarInput {
        name: "Swift".to_string(),
        company: "maruti".to_string(),
        fuel_type: "Petrol".to_string(),
        year: 2015,
        kms_driven: 45000,
    }
}

#[test]
fn test_train_then_predict_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("cars.csv");
    common::write_csv(&csv, 200);
    let artifacts = dir.path().join("artifacts");

    let config = AppConfig::default()
        .with_data_path(&csv)
        .with_artifacts_dir(&artifacts);
    let summary = TrainingPipeline::from_config(config).unwrap().run().unwrap();

    assert!(summary.best_score >= 0.6, "best r2 {}", summary.best_score);
    assert_eq!(summary.report.len(), 5);
    assert_eq!(summary.train_rows + summary.test_rows, 200);
    assert_eq!(summary.test_rows, 40);
    assert!(artifacts.join("preprocessor.bin").is_file());
    assert!(artifacts.join("model.bin").is_file());

    let store = FileArtifactStore::new(&artifacts);
    let service: PredictionService = PredictionService::load(&store, 2025).unwrap();

    let record = swift().validate(2025).unwrap();
    assert_eq!(record.company, "Maruti");
    assert_eq!(FeatureEngineer::new(2025).engineer_record(&record).age, 10.0);

    let price = service.predict(&swift()).unwrap();
    assert!(price.is_finite());
    assert!(price >= 0.0);

    // same request, same answer
    assert_eq!(service.predict(&swift()).unwrap(), price);
}

#[test]
fn test_weak_models_persist_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = dir.path().join("artifacts");
    let config = AppConfig::default().with_artifacts_dir(&artifacts);

    let pipeline = TrainingPipeline::new(
        config,
        Box::new(InMemoryProvider::new(common::car_table(80))),
    );
    let err = pipeline
        .run_with_candidates(vec![Candidate::new("Mean", MeanModel::default())])
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Training));
    assert!(matches!(err.root_cause(), CarPriceError::ModelQuality { .. }));

    let store = FileArtifactStore::new(&artifacts);
    assert!(!store.exists(ArtifactKey::Preprocessor));
    assert!(!store.exists(ArtifactKey::Model));
}

#[test]
fn test_repeated_runs_give_identical_reports() {
    let run = || {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default()
            .with_artifacts_dir(dir.path())
            .with_acceptance_threshold(0.0);
        TrainingPipeline::new(config, Box::new(InMemoryProvider::new(common::car_table(120))))
            .run()
            .unwrap()
    };

    let first = run();
    let second = run();
    let scores = |s: &carprice::pipeline::TrainingSummary| {
        s.report
            .iter()
            .map(|(name, score)| (name.to_string(), score))
            .collect::<Vec<_>>()
    };
    assert_eq!(scores(&first), scores(&second));
    assert_eq!(first.best_model_name, second.best_model_name);
}

#[test]
fn test_missing_column_fails_at_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::default().with_artifacts_dir(dir.path());
    let table = common::car_table(40).drop("fuel_type").unwrap();

    let err = TrainingPipeline::new(config, Box::new(InMemoryProvider::new(table)))
        .run()
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Ingestion));
    assert!(matches!(err.root_cause(), CarPriceError::Ingestion(_)));
}

#[test]
fn test_threshold_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = dir.path().join("artifacts");
    let config = AppConfig::default()
        .with_artifacts_dir(&artifacts)
        .with_acceptance_threshold(-1.0);

    let summary = TrainingPipeline::new(config, Box::new(InMemoryProvider::new(common::car_table(80))))
        .run_with_candidates(vec![Candidate::new("Mean", MeanModel::default())])
        .unwrap();
    assert_eq!(summary.best_model_name, "Mean");
    assert!(FileArtifactStore::new(&artifacts).exists(ArtifactKey::Model));
}

#[test]
fn test_serving_year_must_match_training_year() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = dir.path().join("artifacts");
    let config = AppConfig::default()
        .with_artifacts_dir(&artifacts)
        .with_reference_year(2030)
        .with_acceptance_threshold(-1.0);
    TrainingPipeline::new(config, Box::new(InMemoryProvider::new(common::car_table(80))))
        .run_with_candidates(vec![Candidate::new("Mean", MeanModel::default())])
        .unwrap();

    let store = FileArtifactStore::new(&artifacts);
    let err = PredictionService::<MeanModel>::load(&store, 2025).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        CarPriceError::ReferenceYearMismatch {
            trained: 2030,
            configured: 2025
        }
    ));

    let service = PredictionService::<MeanModel>::load(&store, 2030).unwrap();
    assert_eq!(service.reference_year(), 2030);
}

#[test]
fn test_failed_persistence_leaves_no_partial_pair() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = dir.path().join("artifacts");
    std::fs::create_dir_all(artifacts.join("model.bin")).unwrap();

    let config = AppConfig::default()
        .with_artifacts_dir(&artifacts)
        .with_acceptance_threshold(-1.0);
    let err = TrainingPipeline::new(config, Box::new(InMemoryProvider::new(common::car_table(80))))
        .run_with_candidates(vec![Candidate::new("Mean", MeanModel::default())])
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Persistence));
    assert!(!FileArtifactStore::new(&artifacts).exists(ArtifactKey::Preprocessor));
}
