use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use crate::label::DEFAULT_NUM_CLASSES;

pub const DEFAULT_HIDDEN_SIZE: usize = 128;
pub const DEFAULT_DROPOUT: f32 = 0.5;

/// Hyperparameters needed to rebuild a [`super::RecurrentClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Length of every token sequence fed to the model
    pub max_len: usize,
    /// Width of the pretrained word vectors
    pub embedding_dim: usize,
    /// Hidden width of both recurrent layers
    pub hidden_size: usize,
    /// Number of label categories
    pub num_classes: usize,
    /// Probability of zeroing a unit during training
    pub dropout: f32,
    /// Seed for parameter initialization
    pub seed: u64,
}

impl ModelConfig {
    /// Checks every field, naming the first offending one.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.max_len == 0 {
            return Err(ClassifierError::ValidationError("max_len must be at least 1".into()));
        }
        if self.embedding_dim == 0 {
            return Err(ClassifierError::ValidationError("embedding_dim must be at least 1".into()));
        }
        if self.hidden_size == 0 {
            return Err(ClassifierError::ValidationError("hidden_size must be at least 1".into()));
        }
        if self.num_classes < 2 {
            return Err(ClassifierError::ValidationError(format!(
                "num_classes must be at least 2, got {}",
                self.num_classes
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ClassifierError::ValidationError(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_len: 10,
            embedding_dim: 50,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            num_classes: DEFAULT_NUM_CLASSES,
            dropout: DEFAULT_DROPOUT,
            seed: 0,
        }
    }
}
