use crate::error::{AppError, Result};
use ndarray::Array2;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Layout of a prediction request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// `[]`
    Empty,
    /// `[[5.1, 3.5, 1.4, 0.2], ...]`, positional in model feature order
    RowLists,
    /// `[{"sepal length (cm)": 5.1, ...}, ...]`
    RowObjects,
    /// `{"sepal length (cm)": [5.1, ...], ...}`
    Columns,
}

impl std::fmt::Display for RequestShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestShape::Empty => write!(f, "empty"),
            RequestShape::RowLists => write!(f, "row_lists"),
            RequestShape::RowObjects => write!(f, "row_objects"),
            RequestShape::Columns => write!(f, "columns"),
        }
    }
}

/// Feature rows parsed from a request, aligned to the model's column order
#[derive(Debug, Clone)]
pub struct FeatureBatch {
    pub features: Array2<f64>,
    pub shape: RequestShape,
}

impl FeatureBatch {
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }
}

/// Turns JSON request bodies into feature matrices for a fixed column set
#[derive(Debug, Clone)]
pub struct FeatureParser<'a> {
    feature_names: &'a [String],
}

impl<'a> FeatureParser<'a> {
    pub fn new(feature_names: &'a [String]) -> Self {
        Self { feature_names }
    }

    /// Parse any of the accepted [`RequestShape`]s.
    /// Every failure is a [`AppError::Validation`].
    pub fn parse(&self, payload: &Value) -> Result<FeatureBatch> {
        match payload {
            Value::Array(rows) if rows.is_empty() => Ok(FeatureBatch {
                features: Array2::zeros((0, self.feature_names.len())),
                shape: RequestShape::Empty,
            }),
            Value::Array(rows) => match &rows[0] {
                Value::Array(_) => self.parse_row_lists(rows),
                Value::Object(_) => self.parse_row_objects(rows),
                other => Err(invalid(format!(
                    "expected each row to be a list of values or an object keyed by feature name, got {}",
                    kind(other)
                ))),
            },
            Value::Object(columns) => self.parse_columns(columns),
            other => Err(invalid(format!(
                "expected a list of rows or a mapping of feature name to values, got {}",
                kind(other)
            ))),
        }
    }

    fn parse_row_lists(&self, rows: &[Value]) -> Result<FeatureBatch> {
        let n_features = self.feature_names.len();
        let mut values = Vec::with_capacity(rows.len() * n_features);

        for (i, row) in rows.iter().enumerate() {
            let row = row.as_array().ok_or_else(|| {
                invalid(format!("row {}: expected a list of values, got {}", i, kind(row)))
            })?;
            if row.len() != n_features {
                return Err(invalid(format!(
                    "row {}: expected {} values, got {}",
                    i,
                    n_features,
                    row.len()
                )));
            }
            for (value, name) in row.iter().zip(self.feature_names) {
                values.push(numeric(value, i, name)?);
            }
        }

        self.build(rows.len(), values, RequestShape::RowLists)
    }

    fn parse_row_objects(&self, rows: &[Value]) -> Result<FeatureBatch> {
        let mut values = Vec::with_capacity(rows.len() * self.feature_names.len());

        for (i, row) in rows.iter().enumerate() {
            let row = row.as_object().ok_or_else(|| {
                invalid(format!(
                    "row {}: expected an object keyed by feature name, got {}",
                    i,
                    kind(row)
                ))
            })?;
            self.check_columns(row.keys(), &format!("row {}", i))?;
            for name in self.feature_names {
                values.push(numeric(&row[name.as_str()], i, name)?);
            }
        }

        self.build(rows.len(), values, RequestShape::RowObjects)
    }

    fn parse_columns(&self, columns: &Map<String, Value>) -> Result<FeatureBatch> {
        self.check_columns(columns.keys(), "request")?;

        let mut ordered = Vec::with_capacity(self.feature_names.len());
        for name in self.feature_names {
            let column = columns[name.as_str()].as_array().ok_or_else(|| {
                invalid(format!(
                    "column '{}': expected a list of values, got {}",
                    name,
                    kind(&columns[name.as_str()])
                ))
            })?;
            ordered.push((name, column));
        }

        let n_rows = ordered.first().map(|(_, c)| c.len()).unwrap_or(0);
        if let Some((name, column)) = ordered.iter().find(|(_, c)| c.len() != n_rows) {
            return Err(invalid(format!(
                "column '{}' has {} values, expected {}",
                name,
                column.len(),
                n_rows
            )));
        }

        let mut values = Vec::with_capacity(n_rows * ordered.len());
        for i in 0..n_rows {
            for (name, column) in &ordered {
                values.push(numeric(&column[i], i, name)?);
            }
        }

        self.build(n_rows, values, RequestShape::Columns)
    }

    fn check_columns<'k>(
        &self,
        keys: impl Iterator<Item = &'k String>,
        context: &str,
    ) -> Result<()> {
        let given: BTreeSet<&str> = keys.map(String::as_str).collect();
        let expected: BTreeSet<&str> = self.feature_names.iter().map(String::as_str).collect();
        if given == expected {
            return Ok(());
        }

        let missing: Vec<&str> = expected.difference(&given).copied().collect();
        let unexpected: Vec<&str> = given.difference(&expected).copied().collect();
        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!("missing columns {:?}", missing));
        }
        if !unexpected.is_empty() {
            problems.push(format!("unexpected columns {:?}", unexpected));
        }
        Err(invalid(format!("{}: {}", context, problems.join(", "))))
    }

    fn build(&self, n_rows: usize, values: Vec<f64>, shape: RequestShape) -> Result<FeatureBatch> {
        let features = Array2::from_shape_vec((n_rows, self.feature_names.len()), values)
            .map_err(|e| AppError::Internal(format!("Failed to create feature array: {}", e)))?;
        Ok(FeatureBatch { features, shape })
    }
}

fn numeric(value: &Value, row: usize, column: &str) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            invalid(format!(
                "row {}, column '{}': {} is not representable as a float",
                row, column, n
            ))
        }),
        other => Err(invalid(format!(
            "row {}, column '{}': expected a number, got {}",
            row,
            column,
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn invalid(message: String) -> AppError {
    AppError::Validation(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_empty_list() {
        let names = names();
        let batch = FeatureParser::new(&names).parse(&json!([])).unwrap();
        assert_eq!(batch.shape, RequestShape::Empty);
        assert_eq!(batch.features.dim(), (0, 2));
    }

    #[test]
    fn test_all_shapes_agree() {
        let names = names();
        let parser = FeatureParser::new(&names);

        let lists = parser.parse(&json!([[1, 2.5], [3.0, 4]])).unwrap();
        let objects = parser
            .parse(&json!([{"b": 2.5, "a": 1}, {"a": 3.0, "b": 4}]))
            .unwrap();
        let columns = parser.parse(&json!({"b": [2.5, 4], "a": [1, 3]})).unwrap();

        let expected = array![[1.0, 2.5], [3.0, 4.0]];
        assert_eq!(lists.features, expected);
        assert_eq!(objects.features, expected);
        assert_eq!(columns.features, expected);
        assert_eq!(lists.shape, RequestShape::RowLists);
        assert_eq!(objects.shape, RequestShape::RowObjects);
        assert_eq!(columns.shape, RequestShape::Columns);
    }

    #[test]
    fn test_string_value_rejected() {
        let names = names();
        let err = FeatureParser::new(&names)
            .parse(&json!([[1.0, "2.0"]]))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("column 'b'"));
    }

    #[test]
    fn test_null_and_bool_rejected() {
        let names = names();
        let parser = FeatureParser::new(&names);
        assert!(parser.parse(&json!([[1.0, null]])).is_err());
        assert!(parser.parse(&json!([[true, 1.0]])).is_err());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let names = names();
        let err = FeatureParser::new(&names)
            .parse(&json!([[1.0, 2.0], [3.0]]))
            .unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_mixed_rows_rejected() {
        let names = names();
        let parser = FeatureParser::new(&names);
        assert!(parser.parse(&json!([[1.0, 2.0], {"a": 1, "b": 2}])).is_err());
    }

    #[test]
    fn test_flat_list_rejected() {
        let names = names();
        assert!(FeatureParser::new(&names).parse(&json!([1.0, 2.0])).is_err());
    }

    #[test]
    fn test_scalar_body_rejected() {
        let names = names();
        let parser = FeatureParser::new(&names);
        assert!(parser.parse(&json!(42)).is_err());
        assert!(parser.parse(&json!("rows")).is_err());
        assert!(parser.parse(&Value::Null).is_err());
    }

    #[test]
    fn test_column_mismatch_reported() {
        let names = names();
        let err = FeatureParser::new(&names)
            .parse(&json!([{"a": 1.0, "c": 2.0}]))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("missing columns [\"b\"]"));
        assert!(message.contains("unexpected columns [\"c\"]"));
    }

    #[test]
    fn test_uneven_columns_rejected() {
        let names = names();
        let err = FeatureParser::new(&names)
            .parse(&json!({"a": [1.0, 2.0], "b": [1.0]}))
            .unwrap_err();
        assert!(err.to_string().contains("column 'b'"));
    }
}
