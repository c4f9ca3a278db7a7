use crate::dataset::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TrainingConfig {
    /// Number of bagged trees
    #[serde(default = "default_n_trees")]
    #[validate(range(min = 1))]
    pub n_trees: u16,

    /// Seed for bootstrap sampling and split-candidate selection
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Maximum tree depth (unbounded when absent)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_depth: Option<u16>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            seed: default_seed(),
            max_depth: None,
        }
    }
}

impl TrainingConfig {
    /// Hyperparameters as recorded in model metadata
    pub fn as_hyperparameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("n_trees".to_string(), self.n_trees.to_string());
        params.insert("seed".to_string(), self.seed.to_string());
        params.insert(
            "max_depth".to_string(),
            self.max_depth
                .map(|d| d.to_string())
                .unwrap_or_else(|| "none".to_string()),
        );
        params
    }
}

fn default_n_trees() -> u16 {
    100
}

fn default_seed() -> u64 {
    42
}

/// Model evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy
    pub accuracy: f64,

    /// Macro-averaged precision
    pub precision: f64,

    /// Macro-averaged recall
    pub recall: f64,

    /// Macro-averaged F1 score
    pub f1_score: f64,

    /// Rows are true classes, columns predicted classes, both in `classes` order
    pub confusion_matrix: Option<Vec<Vec<usize>>>,

    /// Per-class metrics keyed by label
    pub per_class_metrics: BTreeMap<String, ClassMetrics>,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            confusion_matrix: None,
            per_class_metrics: BTreeMap::new(),
        }
    }

    /// Compare predictions with the true labels over the given classes
    pub fn from_predictions(y_true: &[Label], y_pred: &[Label], classes: &[Label]) -> Self {
        let n_samples = y_true.len();
        if n_samples == 0 || classes.is_empty() {
            return Self::new();
        }

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| t == p)
            .count();
        let accuracy = correct as f64 / n_samples as f64;

        let position = |label: &Label| classes.iter().position(|c| c == label);
        let mut confusion = vec![vec![0usize; classes.len()]; classes.len()];
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            if let (Some(i), Some(j)) = (position(t), position(p)) {
                confusion[i][j] += 1;
            }
        }

        let mut per_class = BTreeMap::new();

        for (idx, class) in classes.iter().enumerate() {
            let tp = confusion[idx][idx];
            let predicted: usize = confusion.iter().map(|row| row[idx]).sum();
            let support: usize = confusion[idx].iter().sum();

            let precision = if predicted > 0 {
                tp as f64 / predicted as f64
            } else {
                0.0
            };

            let recall = if support > 0 {
                tp as f64 / support as f64
            } else {
                0.0
            };

            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            per_class.insert(
                class.to_string(),
                ClassMetrics {
                    precision,
                    recall,
                    f1_score: f1,
                    support,
                },
            );
        }

        let n_classes = classes.len() as f64;
        let avg_precision = per_class.values().map(|m| m.precision).sum::<f64>() / n_classes;
        let avg_recall = per_class.values().map(|m| m.recall).sum::<f64>() / n_classes;
        let avg_f1 = per_class.values().map(|m| m.f1_score).sum::<f64>() / n_classes;

        Self {
            accuracy,
            precision: avg_precision,
            recall: avg_recall,
            f1_score: avg_f1,
            confusion_matrix: Some(confusion),
            per_class_metrics: per_class,
        }
    }
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Unique id assigned at training time
    pub id: Uuid,

    /// Model name
    pub name: String,

    /// Model version
    pub version: String,

    /// Fitting algorithm
    pub algorithm: String,

    /// Training timestamp
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Number of training samples
    pub n_training_samples: usize,

    /// Number of features
    pub n_features: usize,

    /// Feature column names, in the order the model expects them
    pub feature_names: Vec<String>,

    /// Distinct labels seen during training, ascending
    pub classes: Vec<Label>,

    /// SHA-256 of the dataset file the model was fitted on
    pub dataset_sha256: Option<String>,

    /// Training metrics
    pub training_metrics: ModelMetrics,

    /// Validation metrics
    pub validation_metrics: Option<ModelMetrics>,

    /// Hyperparameters
    pub hyperparameters: BTreeMap<String, String>,
}

impl ModelMetadata {
    pub fn new(name: &str, algorithm: &str, hyperparameters: BTreeMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            version: "1.0".to_string(),
            algorithm: algorithm.to_string(),
            trained_at: chrono::Utc::now(),
            n_training_samples: 0,
            n_features: 0,
            feature_names: Vec::new(),
            classes: Vec::new(),
            dataset_sha256: None,
            training_metrics: ModelMetrics::new(),
            validation_metrics: None,
            hyperparameters,
        }
    }
}
