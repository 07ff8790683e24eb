mod baseline;
pub mod builder;
#[allow(clippy::module_inception)]
mod classifier;
mod config;
mod embedding;
mod error;
mod layers;
mod utils;

pub use baseline::AveragingClassifier;
pub use builder::ClassifierBuilder;
pub use classifier::RecurrentClassifier;
pub use config::{ModelConfig, DEFAULT_DROPOUT, DEFAULT_HIDDEN_SIZE};
pub use embedding::EmbeddingTable;
pub use error::ClassifierError;
pub use layers::{ForwardMode, TrainableParameters};

pub(crate) use utils::argmax;

/// Information about the current configuration of a classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierInfo {
    /// Length of every input sequence
    pub max_len: usize,
    /// Number of words in the vocabulary (excluding the pad row)
    pub vocabulary_size: usize,
    /// Size of the word vectors
    pub embedding_dim: usize,
    /// Hidden width of the recurrent layers
    pub hidden_size: usize,
    /// Number of label categories
    pub num_classes: usize,
    /// Scalars updated by training
    pub trainable_params: usize,
    /// Scalars in the frozen embedding table
    pub frozen_params: usize,
}
