use crate::dataset::iris;
use crate::error::{AppError, Result};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Integer class label
pub type Label = i32;

/// Name of the label column in the dataset file
pub const TARGET_COLUMN: &str = "target";

/// Table of labeled feature vectors
///
/// Column order is the order of `feature_names`; every row of `features`
/// has exactly one entry in `targets`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDataset {
    feature_names: Vec<String>,
    features: Array2<f64>,
    targets: Vec<Label>,
}

impl FeatureDataset {
    /// Create a dataset, checking that the table is rectangular
    pub fn new(
        feature_names: Vec<String>,
        features: Array2<f64>,
        targets: Vec<Label>,
    ) -> Result<Self> {
        let (n_rows, n_cols) = features.dim();
        if n_cols != feature_names.len() {
            return Err(AppError::InvalidDataset(format!(
                "{} feature names for {} feature columns",
                feature_names.len(),
                n_cols
            )));
        }
        if n_rows != targets.len() {
            return Err(AppError::InvalidDataset(format!(
                "{} feature rows for {} labels",
                n_rows,
                targets.len()
            )));
        }
        if feature_names.iter().any(|name| name == TARGET_COLUMN) {
            return Err(AppError::InvalidDataset(format!(
                "'{}' cannot be a feature column",
                TARGET_COLUMN
            )));
        }

        Ok(Self {
            feature_names,
            features,
            targets,
        })
    }

    /// The built-in iris reference table
    pub fn builtin() -> Self {
        let mut features = Array2::zeros((iris::SAMPLES.len(), iris::FEATURE_NAMES.len()));
        let mut targets = Vec::with_capacity(iris::SAMPLES.len());

        for (i, (row, label)) in iris::SAMPLES.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                features[[i, j]] = value;
            }
            targets.push(*label);
        }

        Self {
            feature_names: iris::FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            features,
            targets,
        }
    }

    /// Read a dataset file written by [`FeatureDataset::write_csv`]
    ///
    /// The `target` column holds the labels; every other column is a
    /// feature, kept in file order.
    pub fn read_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::DatasetNotFound(path.to_path_buf()));
        }

        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let target_positions: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| *name == TARGET_COLUMN)
            .map(|(i, _)| i)
            .collect();
        let target_idx = match target_positions.as_slice() {
            [idx] => *idx,
            [] => {
                return Err(AppError::InvalidDataset(format!(
                    "missing '{}' column",
                    TARGET_COLUMN
                )))
            }
            _ => {
                return Err(AppError::InvalidDataset(format!(
                    "duplicate '{}' column",
                    TARGET_COLUMN
                )))
            }
        };

        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_idx)
            .map(|(_, name)| name.to_string())
            .collect();
        if feature_names.is_empty() {
            return Err(AppError::InvalidDataset("no feature columns".to_string()));
        }

        let mut values = Vec::new();
        let mut targets = Vec::new();

        for (i, record) in reader.records().enumerate() {
            // Header is line 1
            let line = i + 2;
            let record =
                record.map_err(|e| AppError::InvalidDataset(format!("line {}: {}", line, e)))?;

            for (j, field) in record.iter().enumerate() {
                if j == target_idx {
                    targets.push(parse_label(field).ok_or_else(|| {
                        AppError::InvalidDataset(format!(
                            "line {}: label '{}' is not an integer",
                            line, field
                        ))
                    })?);
                } else {
                    let value: f64 = field.trim().parse().map_err(|_| {
                        AppError::InvalidDataset(format!(
                            "line {}: value '{}' in column '{}' is not numeric",
                            line, field, &headers[j]
                        ))
                    })?;
                    values.push(value);
                }
            }
        }

        if targets.is_empty() {
            return Err(AppError::InvalidDataset("dataset has no rows".to_string()));
        }

        let features = Array2::from_shape_vec((targets.len(), feature_names.len()), values)
            .map_err(|e| AppError::InvalidDataset(e.to_string()))?;

        Self::new(feature_names, features, targets)
    }

    /// Write the table as comma-separated values with a header row,
    /// creating parent directories as needed
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;

        let mut header: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        header.push(TARGET_COLUMN);
        writer.write_record(&header)?;

        for (row, label) in self.features.rows().into_iter().zip(&self.targets) {
            // Debug formatting keeps the decimal point on integral floats
            let mut record: Vec<String> = row.iter().map(|v| format!("{:?}", v)).collect();
            record.push(label.to_string());
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn targets(&self) -> &[Label] {
        &self.targets
    }

    pub fn n_samples(&self) -> usize {
        self.targets.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Distinct labels, ascending
    pub fn classes(&self) -> Vec<Label> {
        self.class_counts().into_keys().collect()
    }

    /// Number of rows per label
    pub fn class_counts(&self) -> BTreeMap<Label, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.targets {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}

/// Labels are integers; pandas-style "1.0" is accepted when integral.
fn parse_label(field: &str) -> Option<Label> {
    let field = field.trim();
    if let Ok(label) = field.parse::<Label>() {
        return Some(label);
    }

    let value: f64 = field.parse().ok()?;
    if value.fract() == 0.0 && value >= Label::MIN as f64 && value <= Label::MAX as f64 {
        Some(value as Label)
    } else {
        None
    }
}
