use crate::dataset::FeatureDataset;
use crate::error::{AppError, Result};
use crate::ml::artifact::{file_digest, ModelStore};
use crate::ml::classifier::{Classifier, RandomForestModel};
use crate::ml::models::{ModelMetadata, TrainingConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use validator::Validate;

/// Outcome of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Where the artifact was written
    pub model_path: PathBuf,

    /// Metadata of the persisted model, including training metrics
    pub metadata: ModelMetadata,
}

/// Fits the random forest and persists it
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit a model on every row of `dataset`
    pub fn fit(&self, dataset: &FeatureDataset) -> Result<RandomForestModel> {
        self.config
            .validate()
            .map_err(|e| AppError::Training(format!("invalid hyperparameters: {}", e)))?;

        info!(
            samples = dataset.n_samples(),
            features = dataset.n_features(),
            n_trees = self.config.n_trees,
            seed = self.config.seed,
            "Training random forest"
        );

        let mut model = RandomForestModel::new(self.config.clone());
        let metrics = model.train(dataset)?;

        info!(
            accuracy = metrics.accuracy,
            f1_score = metrics.f1_score,
            "Training complete"
        );
        Ok(model)
    }

    /// Read the dataset file, fit, and write the artifact.
    ///
    /// Nothing is written unless fitting succeeds.
    pub fn train(&self, dataset_path: &Path, model_path: &Path) -> Result<TrainingReport> {
        let dataset = FeatureDataset::read_csv(dataset_path)?;
        let digest = file_digest(dataset_path)?;

        let mut model = self.fit(&dataset)?;
        model.set_dataset_digest(digest);

        ModelStore::new(model_path).save(&model)?;

        info!(
            dataset = %dataset_path.display(),
            model = %model_path.display(),
            model_id = %model.metadata().id,
            "Model saved"
        );

        Ok(TrainingReport {
            model_path: model_path.to_path_buf(),
            metadata: model.metadata().clone(),
        })
    }
}
