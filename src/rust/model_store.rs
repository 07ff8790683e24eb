use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::classifier::{ClassifierError, EmbeddingTable, ModelConfig, RecurrentClassifier};
use crate::runtime::RuntimeConfig;
use crate::vocabulary::VocabularyIndex;

/// Bumped whenever the artifact layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

const CONFIG_FILE: &str = "config.json";
const WEIGHTS_FILE: &str = "weights.safetensors";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Model not saved: {0}")]
    NotSaved(String),
    #[error("Invalid model name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Manifest error: {0}")]
    ManifestError(#[from] serde_json::Error),
    #[error("Tensor error: {0}")]
    TensorError(#[from] candle_core::Error),
    #[error("Classifier error: {0}")]
    ClassifierError(#[from] ClassifierError),
    #[error("Unsupported artifact format version {0}")]
    UnsupportedFormat(u32),
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
    #[error("Vocabulary mismatch: model was trained with {expected}, got {actual}")]
    VocabularyMismatch { expected: String, actual: String },
}

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub format_version: u32,
    pub config: ModelConfig,
    pub vocabulary_size: usize,
    pub vocabulary_fingerprint: String,
    pub weights_sha256: String,
}

/// A directory of named model artifacts.
///
/// Each model lives in its own subdirectory holding the manifest and the
/// trainable weights. The embedding table is not stored; it is rebuilt from
/// the word vectors on load and checked against the recorded vocabulary.
#[derive(Debug, Clone)]
pub struct ModelStore {
    models_dir: PathBuf,
}

impl ModelStore {
    /// Creates a new ModelStore in the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        if let Ok(path) = env::var("EMOJIFY_CACHE") {
            return PathBuf::from(path).join("models");
        }

        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("emojify").join("models");
        }

        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("emojify").join("models");
        }

        env::temp_dir().join("emojify").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    fn model_dir(&self, name: &str) -> Result<PathBuf, StoreError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.chars().any(char::is_control);
        if !valid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.models_dir.join(name))
    }

    pub fn get_config_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.model_dir(name)?.join(CONFIG_FILE))
    }

    pub fn get_weights_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.model_dir(name)?.join(WEIGHTS_FILE))
    }

    pub fn is_model_saved(&self, name: &str) -> bool {
        match (self.get_config_path(name), self.get_weights_path(name)) {
            (Ok(config_path), Ok(weights_path)) => {
                log::debug!("Checking if model '{}' is saved:", name);
                log::debug!("  Config path: {:?} (exists: {})", config_path, config_path.exists());
                log::debug!("  Weights path: {:?} (exists: {})", weights_path, weights_path.exists());
                config_path.exists() && weights_path.exists()
            }
            _ => false,
        }
    }

    /// Writes the classifier's trainable weights and manifest under `name`,
    /// replacing any model already saved there.
    pub fn save(
        &self,
        name: &str,
        classifier: &RecurrentClassifier,
        vocabulary: &VocabularyIndex,
    ) -> Result<ModelManifest, StoreError> {
        let model_dir = self.model_dir(name)?;
        log::info!("Saving model '{}' to {:?}", name, model_dir);
        fs::create_dir_all(&model_dir)?;

        let weights_path = model_dir.join(WEIGHTS_FILE);
        let tensors = classifier.trainable_parameters().named_tensors();
        candle_core::safetensors::save(&tensors, &weights_path)?;

        let manifest = ModelManifest {
            format_version: FORMAT_VERSION,
            config: classifier.config().clone(),
            vocabulary_size: vocabulary.len(),
            vocabulary_fingerprint: vocabulary.fingerprint(),
            weights_sha256: hash_file(&weights_path)?,
        };
        fs::write(model_dir.join(CONFIG_FILE), serde_json::to_string_pretty(&manifest)?)?;
        log::info!(
            "Saved {} tensors ({} parameters), sha256 {}",
            tensors.len(),
            classifier.trainable_parameters().num_params(),
            manifest.weights_sha256
        );
        Ok(manifest)
    }

    pub fn read_manifest(&self, name: &str) -> Result<ModelManifest, StoreError> {
        let config_path = self.get_config_path(name)?;
        if !config_path.exists() {
            return Err(StoreError::NotSaved(name.to_string()));
        }
        let manifest: ModelManifest = serde_json::from_str(&fs::read_to_string(&config_path)?)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedFormat(manifest.format_version));
        }
        Ok(manifest)
    }

    /// Rebuilds a saved classifier around `embeddings`.
    ///
    /// # Errors
    /// - `NotSaved` if either file is missing
    /// - `HashMismatch` if the weights file changed since it was saved
    /// - `VocabularyMismatch` if `vocabulary` differs from the training one
    pub fn load(
        &self,
        name: &str,
        embeddings: impl Into<Arc<EmbeddingTable>>,
        vocabulary: &VocabularyIndex,
        runtime_config: RuntimeConfig,
    ) -> Result<RecurrentClassifier, StoreError> {
        if !self.is_model_saved(name) {
            return Err(StoreError::NotSaved(name.to_string()));
        }
        let manifest = self.read_manifest(name)?;

        let weights_path = self.get_weights_path(name)?;
        let actual = hash_file(&weights_path)?;
        if actual != manifest.weights_sha256 {
            log::error!("Weights hash mismatch for model '{}'", name);
            return Err(StoreError::HashMismatch {
                file_type: "weights".to_string(),
                expected: manifest.weights_sha256,
                actual,
            });
        }

        let fingerprint = vocabulary.fingerprint();
        if manifest.vocabulary_size != vocabulary.len() || manifest.vocabulary_fingerprint != fingerprint {
            return Err(StoreError::VocabularyMismatch {
                expected: format!(
                    "{} words ({})",
                    manifest.vocabulary_size, manifest.vocabulary_fingerprint
                ),
                actual: format!("{} words ({})", vocabulary.len(), fingerprint),
            });
        }

        let embeddings = embeddings.into();
        if embeddings.dim() != manifest.config.embedding_dim {
            return Err(ClassifierError::DimensionMismatch {
                word: "<embedding table>".to_string(),
                expected: manifest.config.embedding_dim,
                found: embeddings.dim(),
            }
            .into());
        }

        let classifier = RecurrentClassifier::builder()
            .with_runtime_config(runtime_config)
            .with_embeddings(embeddings)
            .with_config(&manifest.config)?
            .build()?;
        let tensors = candle_core::safetensors::load(&weights_path, classifier.device())?;
        classifier.trainable_parameters().load(&tensors)?;
        log::info!("Loaded model '{}' from {:?}", name, weights_path);
        Ok(classifier)
    }

    /// Checks the weights file against the hash recorded in the manifest.
    /// Returns `Ok(false)` when the model is not saved.
    pub fn verify_model(&self, name: &str) -> Result<bool, StoreError> {
        if !self.is_model_saved(name) {
            log::info!("Model '{}' is not saved", name);
            return Ok(false);
        }
        let manifest = self.read_manifest(name)?;
        let actual = hash_file(&self.get_weights_path(name)?)?;
        log::info!("Verification of '{}': {}", name, actual == manifest.weights_sha256);
        Ok(actual == manifest.weights_sha256)
    }

    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        let model_dir = self.model_dir(name)?;
        if model_dir.exists() {
            fs::remove_dir_all(&model_dir)?;
        }
        Ok(())
    }
}

fn hash_file(path: &Path) -> Result<String, StoreError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        for name in ["", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(store.get_config_path(name), Err(StoreError::InvalidName(_))));
            assert!(!store.is_model_saved(name));
        }
        assert!(store.get_weights_path("emoji-v1").is_ok());
    }

    #[test]
    fn test_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        assert!(!store.verify_model("nothing").unwrap());
        assert!(matches!(store.read_manifest("nothing"), Err(StoreError::NotSaved(_))));
        store.remove("nothing").unwrap();
    }
}
