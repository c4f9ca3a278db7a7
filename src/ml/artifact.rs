use crate::config::ArtifactConfig;
use crate::error::{AppError, Result};
use crate::ml::classifier::RandomForestModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Version of the on-disk envelope layout
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    model: &'a RandomForestModel,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u32,
    model: RandomForestModel,
}

/// Reads and writes the serialized model artifact at a fixed path
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist the model.
    ///
    /// Bytes go to a temporary file in the destination directory which is
    /// renamed over `path` once fully written, so readers never observe a
    /// partial artifact.
    pub fn save(&self, model: &RandomForestModel) -> Result<()> {
        let bytes = bincode::serialize(&EnvelopeRef {
            format_version: ARTIFACT_FORMAT_VERSION,
            model,
        })
        .map_err(|e| AppError::Serialization(format!("Failed to serialize model: {}", e)))?;

        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent.to_path_buf()
            }
            None => PathBuf::from("."),
        };

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| AppError::Io(e.error))?;

        info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "Model artifact written"
        );
        Ok(())
    }

    /// Load the model.
    ///
    /// A missing file is an [`AppError::Io`] with kind `NotFound`; an
    /// unreadable or foreign file is an [`AppError::Serialization`].
    pub fn load(&self) -> Result<RandomForestModel> {
        let bytes = fs::read(&self.path)?;

        let version: u32 = bincode::deserialize(&bytes).map_err(|e| {
            AppError::Serialization(format!(
                "{} is not a model artifact: {}",
                self.path.display(),
                e
            ))
        })?;
        if version != ARTIFACT_FORMAT_VERSION {
            return Err(AppError::Serialization(format!(
                "unsupported artifact format version {} (expected {})",
                version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let envelope: Envelope = bincode::deserialize(&bytes).map_err(|e| {
            AppError::Serialization(format!(
                "Failed to deserialize model from {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(
            path = %self.path.display(),
            format_version = envelope.format_version,
            "Model artifact read"
        );
        Ok(envelope.model)
    }
}

/// SHA-256 of a file, lowercase hex
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Result of an artifact retrieval attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Present,
    Absent,
}

impl FetchOutcome {
    fn of(target: &Path) -> Self {
        if target.is_file() {
            FetchOutcome::Present
        } else {
            FetchOutcome::Absent
        }
    }
}

/// Something that can materialise the model artifact on local disk
#[async_trait]
pub trait ArtifactProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Try to place the artifact at `target`. The outcome reflects only
    /// whether the file exists afterwards.
    async fn fetch(&self, target: &Path) -> FetchOutcome;
}

/// Never fetches anything
#[derive(Debug, Clone, Default)]
pub struct NoopArtifactProvider;

#[async_trait]
impl ArtifactProvider for NoopArtifactProvider {
    fn name(&self) -> &str {
        "noop"
    }

    async fn fetch(&self, target: &Path) -> FetchOutcome {
        FetchOutcome::of(target)
    }
}

/// Runs an external command (e.g. `dvc pull`) expected to write the artifact
#[derive(Debug, Clone)]
pub struct CommandArtifactProvider {
    program: String,
    args: Vec<String>,
}

impl CommandArtifactProvider {
    /// Build from an argv list; `None` if it names no program
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Append the artifact path as the final argument
    pub fn with_target(mut self, target: &Path) -> Self {
        self.args.push(target.display().to_string());
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl ArtifactProvider for CommandArtifactProvider {
    fn name(&self) -> &str {
        &self.program
    }

    async fn fetch(&self, target: &Path) -> FetchOutcome {
        let command = self.command_line();
        info!(command = %command, target = %target.display(), "Fetching model artifact");

        match tokio::process::Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                debug!(command = %command, "Artifact command finished");
            }
            Ok(output) => {
                warn!(
                    command = %command,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Artifact command failed"
                );
            }
            Err(e) => {
                warn!(command = %command, error = %e, "Could not run artifact command");
            }
        }

        FetchOutcome::of(target)
    }
}

/// Provider running the configured fetch command with `target` appended,
/// or a no-op when no command is set
pub fn provider_from_config(config: &ArtifactConfig, target: &Path) -> Box<dyn ArtifactProvider> {
    match CommandArtifactProvider::from_argv(&config.fetch_command) {
        Some(provider) => Box::new(provider.with_target(target)),
        None => Box::new(NoopArtifactProvider),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FeatureDataset;
    use crate::ml::classifier::Classifier;
    use crate::ml::models::TrainingConfig;
    use tempfile::TempDir;

    fn trained_model() -> RandomForestModel {
        let mut model = RandomForestModel::new(TrainingConfig {
            n_trees: 10,
            ..Default::default()
        });
        model.train(&FeatureDataset::builtin()).unwrap();
        model
    }

    #[test]
    fn test_save_and_load_preserves_model() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("models").join("model.joblib"));
        let model = trained_model();

        assert!(!store.exists());
        store.save(&model).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.metadata(), model.metadata());

        let dataset = FeatureDataset::builtin();
        assert_eq!(
            loaded.predict(dataset.features()).unwrap(),
            model.predict(dataset.features()).unwrap()
        );
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("model.joblib"));
        store.save(&trained_model()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("absent.joblib"));

        match store.load() {
            Err(AppError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_garbage_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.joblib");
        fs::write(&path, b"not a model").unwrap();

        let err = ModelStore::new(&path).load().unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.joblib");
        fs::write(&path, bincode::serialize(&99u32).unwrap()).unwrap();

        let err = ModelStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("format version 99"));
    }

    #[test]
    fn test_file_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, b"abc").unwrap();

        assert_eq!(
            file_digest(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_noop_provider_reports_absent() {
        let dir = TempDir::new().unwrap();
        let outcome = NoopArtifactProvider
            .fetch(&dir.path().join("model.joblib"))
            .await;
        assert_eq!(outcome, FetchOutcome::Absent);
    }

    #[tokio::test]
    async fn test_failing_command_reports_absent() {
        let dir = TempDir::new().unwrap();
        let provider =
            CommandArtifactProvider::from_argv(&["definitely-not-a-real-binary-7f3a".to_string()])
                .unwrap();

        let outcome = provider.fetch(&dir.path().join("model.joblib")).await;
        assert_eq!(outcome, FetchOutcome::Absent);
    }

    #[test]
    fn test_provider_from_empty_config_is_noop() {
        let target = Path::new("models/model.joblib");
        let provider = provider_from_config(
            &ArtifactConfig {
                fetch_command: Vec::new(),
            },
            target,
        );
        assert_eq!(provider.name(), "noop");

        let provider = provider_from_config(
            &ArtifactConfig {
                fetch_command: vec![String::new()],
            },
            target,
        );
        assert_eq!(provider.name(), "noop");

        let provider = provider_from_config(&ArtifactConfig::default(), target);
        assert_eq!(provider.name(), "dvc");
    }

    #[test]
    fn test_command_pulls_configured_model_path() {
        let argv = ArtifactConfig::default().fetch_command;
        let provider = CommandArtifactProvider::from_argv(&argv)
            .unwrap()
            .with_target(Path::new("artifacts/iris.bin"));

        assert_eq!(provider.command_line(), "dvc pull artifacts/iris.bin");
    }
}
