/// End-to-end tests for the offline stages: prepare, train, reload
mod common;

use iris_pipeline::{
    dataset::{DataPreparer, FeatureDataset, TARGET_COLUMN},
    ml::{Classifier, InferenceService, ModelStore, ModelTrainer, NoopArtifactProvider},
    AppError,
};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_prepared_file_has_expected_columns_and_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("iris.csv");

    let summary = DataPreparer::new(&path).prepare().unwrap();
    assert_eq!(summary.n_rows, 150);

    let dataset = FeatureDataset::read_csv(&path).unwrap();
    assert_eq!(
        dataset.feature_names(),
        &[
            "sepal length (cm)",
            "sepal width (cm)",
            "petal length (cm)",
            "petal width (cm)"
        ]
    );
    assert_eq!(dataset.n_samples(), 150);
    assert_eq!(dataset.classes(), vec![0, 1, 2]);
    assert!(dataset.class_counts().values().all(|&n| n == 50));

    let header = fs::read_to_string(&path).unwrap();
    assert!(header.lines().next().unwrap().ends_with(TARGET_COLUMN));
}

#[test]
fn test_reloaded_model_accuracy_above_threshold() {
    let dir = common::prepared_dir();
    let dataset_path = dir.path().join("data").join("iris.csv");
    let model_path = dir.path().join("models").join("model.joblib");

    ModelTrainer::new(common::test_training_config())
        .train(&dataset_path, &model_path)
        .unwrap();

    let model = ModelStore::new(&model_path).load().unwrap();
    let dataset = FeatureDataset::read_csv(&dataset_path).unwrap();
    let metrics = model.evaluate(&dataset).unwrap();

    assert!(metrics.accuracy > 0.9, "accuracy {}", metrics.accuracy);
    assert_eq!(model.metadata().feature_names, dataset.feature_names());
    assert!(model.metadata().validation_metrics.is_none());
}

#[test]
fn test_default_hyperparameters_train_one_hundred_trees() {
    let dir = common::prepared_dir();
    let report = ModelTrainer::default()
        .train(
            &dir.path().join("data").join("iris.csv"),
            &dir.path().join("model.joblib"),
        )
        .unwrap();

    assert_eq!(report.metadata.hyperparameters["n_trees"], "100");
    assert!(report.metadata.training_metrics.accuracy > 0.9);
}

#[test]
fn test_training_without_dataset_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("models").join("model.joblib");

    let err = ModelTrainer::default()
        .train(&dir.path().join("data").join("iris.csv"), &model_path)
        .unwrap_err();

    assert!(matches!(err, AppError::DatasetNotFound(_)));
    assert!(err.to_string().starts_with("Dataset not found"));
    assert!(!model_path.exists());
}

#[test]
fn test_retraining_replaces_artifact() {
    let dir = common::prepared_dir();
    let dataset_path = dir.path().join("data").join("iris.csv");
    let model_path = dir.path().join("model.joblib");
    let trainer = ModelTrainer::new(common::test_training_config());

    let first = trainer.train(&dataset_path, &model_path).unwrap();
    let second = trainer.train(&dataset_path, &model_path).unwrap();

    let stored = ModelStore::new(&model_path).load().unwrap();
    assert_ne!(first.metadata.id, second.metadata.id);
    assert_eq!(stored.metadata().id, second.metadata.id);
}

#[tokio::test]
async fn test_trained_artifact_serves_predictions() {
    let dir = common::prepared_dir();
    let model_path = dir.path().join("models").join("model.joblib");
    ModelTrainer::new(common::test_training_config())
        .train(&dir.path().join("data").join("iris.csv"), &model_path)
        .unwrap();

    let service =
        InferenceService::initialize(&ModelStore::new(&model_path), &NoopArtifactProvider).await;

    assert!(service.is_loaded());
    assert_eq!(
        service.predict(&json!([[5.1, 3.5, 1.4, 0.2]])).unwrap(),
        vec![0]
    );
}
