//! Model training, persistence and inference
//!
//! - [`classifier`]: the random forest behind the [`Classifier`] trait
//! - [`trainer`]: dataset file in, model artifact out
//! - [`artifact`]: artifact storage and retrieval
//! - [`features`]: request bodies to feature matrices
//! - [`service`]: the immutable model shared by HTTP handlers

pub mod artifact;
pub mod classifier;
pub mod features;
pub mod models;
pub mod service;
pub mod trainer;

pub use artifact::{
    file_digest, provider_from_config, ArtifactProvider, CommandArtifactProvider, FetchOutcome,
    ModelStore, NoopArtifactProvider, ARTIFACT_FORMAT_VERSION,
};
pub use classifier::{Classifier, RandomForestModel};
pub use features::{FeatureBatch, FeatureParser, RequestShape};
pub use models::{ClassMetrics, ModelMetadata, ModelMetrics, TrainingConfig};
pub use service::{InferenceService, ServiceState};
pub use trainer::{ModelTrainer, TrainingReport};
