//! Iris classification pipeline
//!
//! Three stages wired together by file paths:
//! [`dataset::DataPreparer`] writes the feature table,
//! [`ml::ModelTrainer`] fits a random forest and stores the artifact,
//! and the [`api`] router serves predictions from the loaded model.

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod ml;
pub mod telemetry;

pub use error::{AppError, Result};
