use crate::ml::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Well-known file locations shared by the pipeline stages
    #[serde(default)]
    pub paths: PathsConfig,

    /// Classifier hyperparameters
    #[serde(default)]
    #[validate(nested)]
    pub training: TrainingConfig,

    /// Model artifact retrieval
    #[serde(default)]
    pub artifact: ArtifactConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: IRIS_PIPELINE)
            .add_source(
                config::Environment::with_prefix("IRIS_PIPELINE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("artifact.fetch_command"),
            )
            .build()?
            .try_deserialize()
    }

    /// Load and validate, returning the crate error type
    pub fn load_validated() -> crate::Result<Self> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Attach a permissive CORS layer
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

impl ServerConfig {
    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
            cors_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Feature dataset written by the preparer and read by the trainer
    #[serde(default = "default_dataset_path")]
    pub dataset: PathBuf,

    /// Model artifact written by the trainer and loaded by the service
    #[serde(default = "default_model_path")]
    pub model: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset_path(),
            model: default_model_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// External command run once at startup when the model file is missing.
    /// `paths.model` is appended as its last argument. Empty disables
    /// retrieval.
    #[serde(default)]
    pub fetch_command: Vec<String>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            fetch_command: default_fetch_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    5000
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/iris.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/model.joblib")
}

fn default_fetch_command() -> Vec<String> {
    vec!["dvc".to_string(), "pull".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.paths.dataset, PathBuf::from("data/iris.csv"));
        assert_eq!(config.paths.model, PathBuf::from("models/model.joblib"));
        assert_eq!(config.training.n_trees, 100);
        assert_eq!(config.artifact.fetch_command[0], "dvc");
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn test_embedded_defaults_match_code_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let defaults = Config::default();
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.paths.model, defaults.paths.model);
        assert_eq!(config.training.n_trees, defaults.training.n_trees);
        assert_eq!(config.training.seed, defaults.training.seed);
        assert_eq!(config.artifact.fetch_command, defaults.artifact.fetch_command);
    }

    #[test]
    fn test_zero_trees_rejected() {
        let mut config = Config::default();
        config.training.n_trees = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_addr() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_enabled: false,
        };
        assert_eq!(server.bind_addr(), "127.0.0.1:8000");
    }
}
