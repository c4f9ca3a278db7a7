use crate::dataset::{FeatureDataset, Label};
use crate::error::{AppError, Result};
use crate::ml::models::{ModelMetadata, ModelMetrics, TrainingConfig};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;

/// Trait for classifiers
pub trait Classifier: Send + Sync {
    /// Train the classifier on every row of the dataset
    fn train(&mut self, dataset: &FeatureDataset) -> Result<ModelMetrics>;

    /// Predict class labels, one per row
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<Label>>;

    /// Get model metadata
    fn metadata(&self) -> &ModelMetadata;

    /// Check if model is trained
    fn is_trained(&self) -> bool;

    /// Score the model against a labeled dataset with the same columns
    fn evaluate(&self, dataset: &FeatureDataset) -> Result<ModelMetrics> {
        let expected = &self.metadata().feature_names;
        if dataset.feature_names() != expected.as_slice() {
            return Err(AppError::InvalidDataset(format!(
                "dataset columns {:?} do not match model features {:?}",
                dataset.feature_names(),
                expected
            )));
        }

        let predictions = self.predict(dataset.features())?;
        let mut classes = self.metadata().classes.clone();
        for label in dataset.classes() {
            if !classes.contains(&label) {
                classes.push(label);
            }
        }
        classes.sort_unstable();

        Ok(ModelMetrics::from_predictions(
            dataset.targets(),
            &predictions,
            &classes,
        ))
    }
}

type Forest = RandomForestClassifier<f64, Label, DenseMatrix<f64>, Vec<Label>>;

/// Bagged decision-tree ensemble
#[derive(Serialize, Deserialize)]
pub struct RandomForestModel {
    /// Model metadata
    metadata: ModelMetadata,

    /// Hyperparameters used for fitting
    config: TrainingConfig,

    /// Fitted forest
    forest: Option<Forest>,
}

impl RandomForestModel {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            metadata: ModelMetadata::new(
                "Random Forest",
                "random_forest",
                config.as_hyperparameters(),
            ),
            config,
            forest: None,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Feature names in the column order `predict` expects
    pub fn feature_names(&self) -> &[String] {
        &self.metadata.feature_names
    }

    /// Record the digest of the dataset file the model was fitted on
    pub fn set_dataset_digest(&mut self, digest: String) {
        self.metadata.dataset_sha256 = Some(digest);
    }

    fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
        let shape = arr.shape();
        let data: Vec<f64> = arr.iter().copied().collect();
        DenseMatrix::new(shape[0], shape[1], data, false)
    }
}

impl fmt::Debug for RandomForestModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForestModel")
            .field("metadata", &self.metadata)
            .field("trained", &self.forest.is_some())
            .finish()
    }
}

impl Classifier for RandomForestModel {
    fn train(&mut self, dataset: &FeatureDataset) -> Result<ModelMetrics> {
        if dataset.n_samples() == 0 {
            return Err(AppError::Training("No samples provided for training".to_string()));
        }

        let x = Self::ndarray_to_densematrix(dataset.features());
        let y: Vec<Label> = dataset.targets().to_vec();

        let mut params = RandomForestClassifierParameters::default()
            .with_n_trees(self.config.n_trees)
            .with_seed(self.config.seed);
        if let Some(max_depth) = self.config.max_depth {
            params = params.with_max_depth(max_depth);
        }

        let forest = Forest::fit(&x, &y, params)
            .map_err(|e| AppError::Training(format!("Failed to train random forest: {}", e)))?;

        self.forest = Some(forest);
        self.metadata.n_training_samples = dataset.n_samples();
        self.metadata.n_features = dataset.n_features();
        self.metadata.feature_names = dataset.feature_names().to_vec();
        self.metadata.classes = dataset.classes();
        self.metadata.trained_at = chrono::Utc::now();

        let predictions = self.predict(dataset.features())?;
        let metrics =
            ModelMetrics::from_predictions(dataset.targets(), &predictions, &self.metadata.classes);
        self.metadata.training_metrics = metrics.clone();

        Ok(metrics)
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<Label>> {
        let forest = self
            .forest
            .as_ref()
            .ok_or_else(|| AppError::Internal("Model not trained".to_string()))?;

        let (n_rows, n_cols) = features.dim();
        if n_cols != self.metadata.n_features {
            return Err(AppError::Validation(format!(
                "expected {} features per row, got {}",
                self.metadata.n_features, n_cols
            )));
        }
        if n_rows == 0 {
            return Ok(Vec::new());
        }

        let x = Self::ndarray_to_densematrix(features);
        forest
            .predict(&x)
            .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn is_trained(&self) -> bool {
        self.forest.is_some()
    }
}
