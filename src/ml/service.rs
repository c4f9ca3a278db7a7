use crate::dataset::Label;
use crate::error::{AppError, Result};
use crate::ml::artifact::{ArtifactProvider, FetchOutcome, ModelStore};
use crate::ml::classifier::{Classifier, RandomForestModel};
use crate::ml::features::FeatureParser;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Serving state, fixed once startup finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    ModelLoaded,
    Degraded,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::ModelLoaded => write!(f, "model_loaded"),
            ServiceState::Degraded => write!(f, "degraded"),
        }
    }
}

/// Prediction service
///
/// Holds the model loaded at startup, if any. The model is never replaced,
/// so clones share it without locking.
#[derive(Clone, Default)]
pub struct InferenceService {
    model: Option<Arc<RandomForestModel>>,
}

impl InferenceService {
    /// Service answering with the given model
    pub fn loaded(model: RandomForestModel) -> Self {
        Self {
            model: Some(Arc::new(model)),
        }
    }

    /// Service without a model; every prediction fails
    pub fn degraded() -> Self {
        Self { model: None }
    }

    /// Load the artifact, asking `provider` for it once if it is missing.
    ///
    /// Never fails: any problem leaves the service degraded.
    pub async fn initialize(store: &ModelStore, provider: &dyn ArtifactProvider) -> Self {
        if !store.exists() {
            info!(
                path = %store.path().display(),
                provider = provider.name(),
                "Model artifact missing, attempting retrieval"
            );
            if provider.fetch(store.path()).await == FetchOutcome::Absent {
                warn!(
                    path = %store.path().display(),
                    "Model artifact unavailable, starting without a model"
                );
                return Self::degraded();
            }
        }

        match store.load() {
            Ok(model) => {
                let metadata = model.metadata();
                info!(
                    path = %store.path().display(),
                    model_id = %metadata.id,
                    algorithm = %metadata.algorithm,
                    n_features = metadata.n_features,
                    "Model loaded"
                );
                Self::loaded(model)
            }
            Err(e) => {
                error!(
                    path = %store.path().display(),
                    error = %e,
                    "Failed to load model artifact, starting without a model"
                );
                Self::degraded()
            }
        }
    }

    pub fn state(&self) -> ServiceState {
        if self.model.is_some() {
            ServiceState::ModelLoaded
        } else {
            ServiceState::Degraded
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&RandomForestModel> {
        self.model.as_deref()
    }

    /// Predict one label per row of the request body, in input order
    pub fn predict(&self, payload: &Value) -> Result<Vec<Label>> {
        let model = self.model.as_ref().ok_or(AppError::ModelNotLoaded)?;
        let batch = FeatureParser::new(model.feature_names()).parse(payload)?;

        debug!(rows = batch.n_rows(), shape = %batch.shape, "Predicting");
        model.predict(&batch.features)
    }
}
