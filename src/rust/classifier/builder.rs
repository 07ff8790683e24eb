use std::sync::Arc;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::classifier::RecurrentClassifier;
use super::config::{ModelConfig, DEFAULT_DROPOUT, DEFAULT_HIDDEN_SIZE};
use super::embedding::EmbeddingTable;
use super::error::ClassifierError;
use crate::label::DEFAULT_NUM_CLASSES;
use crate::runtime::{create_device, RuntimeConfig};

/// A builder for constructing a [`RecurrentClassifier`] with a fluent interface.
///
/// The embedding table and `max_len` are required; everything else falls
/// back to the reference configuration (hidden width 128, five classes,
/// dropout 0.5).
#[derive(Debug)]
pub struct ClassifierBuilder {
    embeddings: Option<Arc<EmbeddingTable>>,
    max_len: Option<usize>,
    hidden_size: usize,
    num_classes: usize,
    dropout: f32,
    seed: u64,
    runtime_config: RuntimeConfig,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Creates a new builder with the reference hyperparameters
    pub fn new() -> Self {
        Self {
            embeddings: None,
            max_len: None,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            num_classes: DEFAULT_NUM_CLASSES,
            dropout: DEFAULT_DROPOUT,
            seed: 0,
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the runtime configuration that picks the tensor device
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the frozen embedding table. The table may be shared with other
    /// classifiers through an `Arc`.
    pub fn with_embeddings(mut self, embeddings: impl Into<Arc<EmbeddingTable>>) -> Self {
        self.embeddings = Some(embeddings.into());
        self
    }

    /// Sets the fixed sequence length
    ///
    /// # Errors
    /// - `ValidationError` if `max_len` is zero
    pub fn with_max_len(mut self, max_len: usize) -> Result<Self, ClassifierError> {
        if max_len == 0 {
            return Err(ClassifierError::ValidationError("max_len must be at least 1".into()));
        }
        self.max_len = Some(max_len);
        Ok(self)
    }

    /// Sets the hidden width of both recurrent layers
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Result<Self, ClassifierError> {
        if hidden_size == 0 {
            return Err(ClassifierError::ValidationError("hidden_size must be at least 1".into()));
        }
        self.hidden_size = hidden_size;
        Ok(self)
    }

    /// Sets the number of label categories
    pub fn with_num_classes(mut self, num_classes: usize) -> Result<Self, ClassifierError> {
        if num_classes < 2 {
            return Err(ClassifierError::ValidationError(format!(
                "num_classes must be at least 2, got {}",
                num_classes
            )));
        }
        self.num_classes = num_classes;
        Ok(self)
    }

    /// Sets the dropout probability used during training
    pub fn with_dropout(mut self, dropout: f32) -> Result<Self, ClassifierError> {
        if !(0.0..1.0).contains(&dropout) {
            return Err(ClassifierError::ValidationError(format!(
                "dropout must be in [0, 1), got {}",
                dropout
            )));
        }
        self.dropout = dropout;
        Ok(self)
    }

    /// Sets the seed for parameter initialization
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Copies every hyperparameter from a saved configuration.
    ///
    /// `embedding_dim` is checked against the table at build time.
    pub fn with_config(self, config: &ModelConfig) -> Result<Self, ClassifierError> {
        config.validate()?;
        Ok(self
            .with_max_len(config.max_len)?
            .with_hidden_size(config.hidden_size)?
            .with_num_classes(config.num_classes)?
            .with_dropout(config.dropout)?
            .with_seed(config.seed))
    }

    /// Builds and returns the classifier with freshly initialized parameters
    ///
    /// # Errors
    /// - `BuildError` if no embedding table or `max_len` was set
    pub fn build(self) -> Result<RecurrentClassifier, ClassifierError> {
        let embeddings = self
            .embeddings
            .ok_or_else(|| ClassifierError::BuildError("Embedding table must be set".to_string()))?;
        let max_len = self
            .max_len
            .ok_or_else(|| ClassifierError::BuildError("max_len must be set".to_string()))?;

        let config = ModelConfig {
            max_len,
            embedding_dim: embeddings.dim(),
            hidden_size: self.hidden_size,
            num_classes: self.num_classes,
            dropout: self.dropout,
            seed: self.seed,
        };
        config.validate()?;

        let device = create_device(&self.runtime_config);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let classifier = RecurrentClassifier::from_parts(config, embeddings, device, &mut rng)?;
        info!(
            "Built classifier: max_len={}, hidden={}, classes={}, trainable params={}",
            classifier.config().max_len,
            classifier.config().hidden_size,
            classifier.config().num_classes,
            classifier.trainable_parameters().num_params()
        );
        Ok(classifier)
    }
}
