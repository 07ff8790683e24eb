//! A sentence-to-emoji classifier built on frozen pretrained word vectors and
//! a two-layer recurrent network.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use emojify::{
//!     EmbeddingTable, EmojiMap, Evaluator, Label, RecurrentClassifier, SentenceEncoder, Trainer,
//!     TrainingConfig, VocabularyIndex, WordVectors,
//! };
//!
//! let vectors = WordVectors::from_reader("love 1 0\nfood 0 1\n".as_bytes())?;
//! let vocab = VocabularyIndex::from_word_vectors(&vectors)?;
//! let table = EmbeddingTable::from_word_vectors(&vocab, &vectors)?;
//!
//! let mut classifier = RecurrentClassifier::builder()
//!     .with_embeddings(table)
//!     .with_max_len(4)?
//!     .with_hidden_size(8)?
//!     .build()?;
//!
//! let encoder = SentenceEncoder::new(4)?;
//! let sequences = encoder.encode_all(&["I love you", "food is life"], &vocab)?;
//! let labels = Label::from_indices(&[0, 4], 5)?;
//! let trainer = Trainer::new(TrainingConfig { epochs: 2, ..Default::default() })?;
//! trainer.train(&mut classifier, &sequences, &labels)?;
//!
//! let evaluator = Evaluator::for_recurrent(&classifier, &vocab)?;
//! let label = evaluator.predict("love")?;
//! println!("love {}", EmojiMap::default().display(label));
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! A trained classifier is read-only during inference and can be shared
//! across threads using `Arc`:
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use emojify::{EmbeddingTable, RecurrentClassifier, SentenceEncoder, VocabularyIndex, WordVectors};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let vectors = WordVectors::from_reader("sample 0.5 0.5\n".as_bytes())?;
//! let vocab = Arc::new(VocabularyIndex::from_word_vectors(&vectors)?);
//! let table = EmbeddingTable::from_word_vectors(&vocab, &vectors)?;
//! let classifier = Arc::new(
//!     RecurrentClassifier::builder()
//!         .with_embeddings(table)
//!         .with_max_len(3)?
//!         .with_hidden_size(4)?
//!         .build()?,
//! );
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let classifier = Arc::clone(&classifier);
//!     let vocab = Arc::clone(&vocab);
//!     handles.push(thread::spawn(move || {
//!         let sequence = SentenceEncoder::new(3).unwrap().encode("sample text", &vocab).unwrap();
//!         classifier.predict_proba(&sequence).unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod dataset;
pub mod emoji;
pub mod encoder;
pub mod evaluator;
pub mod label;
pub mod model_store;
mod runtime;
pub mod trainer;
pub mod vectors;
pub mod vocabulary;

pub use classifier::{
    AveragingClassifier, ClassifierBuilder, ClassifierError, ClassifierInfo, EmbeddingTable, ForwardMode,
    ModelConfig, RecurrentClassifier, TrainableParameters,
};
pub use dataset::LabeledSentences;
pub use emoji::{EmojiMap, EmojiSymbol};
pub use encoder::{SentenceEncoder, TokenSequence};
pub use evaluator::{ConfusionMatrix, Evaluation, Evaluator, Mislabeled, SequenceClassifier};
pub use label::{Label, DEFAULT_NUM_CLASSES};
pub use model_store::{ModelManifest, ModelStore, StoreError};
pub use runtime::{create_device, DevicePreference, RuntimeConfig};
pub use trainer::{Trainer, TrainingConfig, TrainingReport};
pub use vectors::WordVectors;
pub use vocabulary::{VocabularyIndex, PAD_ID};

pub fn init_logger() {
    env_logger::init();
}
