use std::sync::Arc;

use candle_core::{Device, Tensor, D};
use log::debug;

use super::config::ModelConfig;
use super::embedding::EmbeddingTable;
use super::error::ClassifierError;
use super::layers::{Dense, Dropout, ForwardMode, LstmLayer, TrainableParameters};
use super::ClassifierInfo;
use crate::encoder::TokenSequence;
use crate::label::Label;

/// Maps fixed-length token sequences to a probability distribution over the
/// emoji categories.
///
/// The forward pass is the composition
/// `embed → lstm1 → dropout → lstm2 → dropout → dense → softmax`.
/// The embedding table is shared and frozen; only the variables in
/// [`TrainableParameters`] ever change, and only through [`crate::Trainer`].
///
/// # Thread Safety
///
/// Inference takes `&self`, so a trained classifier can be wrapped in `Arc`
/// and queried from several threads. Training takes `&mut self`, which rules
/// out readers observing a half-applied optimizer step.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use emojify::{EmbeddingTable, RecurrentClassifier, SentenceEncoder, VocabularyIndex, WordVectors};
///
/// let vectors = WordVectors::from_file("glove.6B.50d.txt")?;
/// let vocab = VocabularyIndex::from_word_vectors(&vectors)?;
/// let table = EmbeddingTable::from_word_vectors(&vocab, &vectors)?;
///
/// let classifier = RecurrentClassifier::builder()
///     .with_embeddings(table)
///     .with_max_len(10)?
///     .build()?;
///
/// let sequence = SentenceEncoder::new(10)?.encode("lets play baseball", &vocab)?;
/// let probabilities = classifier.predict_proba(&sequence)?;
/// assert_eq!(probabilities.len(), 5);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RecurrentClassifier {
    config: ModelConfig,
    device: Device,
    embeddings: Arc<EmbeddingTable>,
    embedding_weights: Tensor,
    recurrent1: LstmLayer,
    dropout1: Dropout,
    recurrent2: LstmLayer,
    dropout2: Dropout,
    dense: Dense,
    parameters: TrainableParameters,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<RecurrentClassifier>();
    }
};

impl RecurrentClassifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    pub(crate) fn from_parts(
        config: ModelConfig,
        embeddings: Arc<EmbeddingTable>,
        device: Device,
        rng: &mut rand::rngs::StdRng,
    ) -> Result<Self, ClassifierError> {
        let embedding_weights = embeddings.to_tensor(&device)?;
        let mut parameters = TrainableParameters::default();
        let recurrent1 = LstmLayer::new(
            "lstm1",
            config.embedding_dim,
            config.hidden_size,
            true,
            rng,
            &device,
            &mut parameters,
        )?;
        let recurrent2 = LstmLayer::new(
            "lstm2",
            config.hidden_size,
            config.hidden_size,
            false,
            rng,
            &device,
            &mut parameters,
        )?;
        let dense = Dense::new(
            "dense",
            config.hidden_size,
            config.num_classes,
            rng,
            &device,
            &mut parameters,
        )?;
        debug!("Initialized {} trainable parameters", parameters.num_params());

        Ok(Self {
            dropout1: Dropout::new(config.dropout),
            dropout2: Dropout::new(config.dropout),
            config,
            device,
            embeddings,
            embedding_weights,
            recurrent1,
            recurrent2,
            dense,
            parameters,
        })
    }

    /// Returns information about the classifier's configuration
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            max_len: self.config.max_len,
            vocabulary_size: self.embeddings.rows() - 1,
            embedding_dim: self.config.embedding_dim,
            hidden_size: self.config.hidden_size,
            num_classes: self.config.num_classes,
            trainable_params: self.parameters.num_params(),
            frozen_params: self.embeddings.rows() * self.embeddings.dim(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn embeddings(&self) -> &EmbeddingTable {
        &self.embeddings
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn trainable_parameters(&self) -> &TrainableParameters {
        &self.parameters
    }

    /// Packs sequences into a `(batch, max_len)` id tensor after checking
    /// their length and id range.
    fn ids_tensor(&self, sequences: &[TokenSequence]) -> Result<Tensor, ClassifierError> {
        if sequences.is_empty() {
            return Err(ClassifierError::ValidationError("Batch cannot be empty".into()));
        }
        let rows = self.embeddings.rows();
        let mut flat = Vec::with_capacity(sequences.len() * self.config.max_len);
        for (i, sequence) in sequences.iter().enumerate() {
            if sequence.len() != self.config.max_len {
                return Err(ClassifierError::ValidationError(format!(
                    "Sequence {} has length {}, expected {}",
                    i,
                    sequence.len(),
                    self.config.max_len
                )));
            }
            if let Some(&id) = sequence.as_slice().iter().find(|&&id| id as usize >= rows) {
                return Err(ClassifierError::IdOutOfRange { id, rows });
            }
            flat.extend_from_slice(sequence.as_slice());
        }
        Ok(Tensor::from_vec(flat, (sequences.len(), self.config.max_len), &self.device)?)
    }

    /// Unnormalized class scores of shape `(batch, num_classes)`.
    pub fn logits(&self, sequences: &[TokenSequence], mut mode: ForwardMode<'_>) -> Result<Tensor, ClassifierError> {
        let ids = self.ids_tensor(sequences)?;
        let (batch, steps) = ids.dims2()?;
        let embedded = self
            .embedding_weights
            .index_select(&ids.flatten_all()?, 0)?
            .reshape((batch, steps, self.config.embedding_dim))?;

        let hidden = self.recurrent1.forward(&embedded)?;
        let hidden = self.dropout1.forward(&hidden, &mut mode)?;
        let last = self.recurrent2.forward(&hidden)?;
        let last = self.dropout2.forward(&last, &mut mode)?;
        self.dense.forward(&last)
    }

    /// Class probabilities of shape `(batch, num_classes)`; every row sums to one.
    pub fn forward(&self, sequences: &[TokenSequence], mode: ForwardMode<'_>) -> Result<Tensor, ClassifierError> {
        let logits = self.logits(sequences, mode)?;
        Ok(candle_nn::ops::softmax(&logits, D::Minus1)?)
    }

    /// Inference-mode probabilities for a single sequence.
    pub fn predict_proba(&self, sequence: &TokenSequence) -> Result<Vec<f32>, ClassifierError> {
        let mut rows = self.predict_batch(std::slice::from_ref(sequence))?;
        rows.pop()
            .ok_or_else(|| ClassifierError::ModelError("Empty prediction batch".into()))
    }

    /// Inference-mode probabilities, one row per sequence.
    pub fn predict_batch(&self, sequences: &[TokenSequence]) -> Result<Vec<Vec<f32>>, ClassifierError> {
        let probabilities = self.forward(sequences, ForwardMode::Inference)?;
        Ok(probabilities.to_vec2::<f32>()?)
    }

    /// Mean categorical cross-entropy between one-hot `labels` and the
    /// softmax of `logits`.
    pub fn cross_entropy(&self, logits: &Tensor, labels: &[Label]) -> Result<Tensor, ClassifierError> {
        let (batch, classes) = logits.dims2()?;
        if batch != labels.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Got {} labels for a batch of {}",
                labels.len(),
                batch
            )));
        }
        let mut one_hot = Vec::with_capacity(batch * classes);
        for label in labels {
            one_hot.extend(label.one_hot(classes)?);
        }
        let targets = Tensor::from_vec(one_hot, (batch, classes), &self.device)?;
        let log_probs = candle_nn::ops::log_softmax(logits, D::Minus1)?;
        Ok(targets.mul(&log_probs)?.sum(1)?.neg()?.mean(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::SentenceEncoder;
    use crate::vectors::WordVectors;
    use crate::vocabulary::VocabularyIndex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup_test_classifier() -> (VocabularyIndex, RecurrentClassifier) {
        let vectors = WordVectors::from_reader("good 1 0 0\nbad 0 1 0\nday 0 0 1\n".as_bytes()).unwrap();
        let vocab = VocabularyIndex::from_word_vectors(&vectors).unwrap();
        let table = EmbeddingTable::from_word_vectors(&vocab, &vectors).unwrap();
        let classifier = RecurrentClassifier::builder()
            .with_embeddings(table)
            .with_max_len(4)
            .unwrap()
            .with_hidden_size(6)
            .unwrap()
            .with_num_classes(3)
            .unwrap()
            .with_seed(11)
            .build()
            .expect("Failed to create classifier");
        (vocab, classifier)
    }

    #[test]
    fn test_info() {
        let (_, classifier) = setup_test_classifier();
        let info = classifier.info();
        assert_eq!(info.vocabulary_size, 3);
        assert_eq!(info.num_classes, 3);
        assert_eq!(info.frozen_params, 4 * 3);
        assert_eq!(classifier.trainable_parameters().len(), 8);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let (vocab, classifier) = setup_test_classifier();
        let seq = SentenceEncoder::new(4).unwrap().encode("good day", &vocab).unwrap();
        assert_eq!(classifier.predict_proba(&seq).unwrap(), classifier.predict_proba(&seq).unwrap());
    }

    #[test]
    fn test_training_mode_uses_rng() {
        let (vocab, classifier) = setup_test_classifier();
        let seq = SentenceEncoder::new(4).unwrap().encode("good day", &vocab).unwrap();
        let mut a = StdRng::seed_from_u64(5);
        let mut b = StdRng::seed_from_u64(5);
        let first: Vec<Vec<f32>> = classifier
            .forward(std::slice::from_ref(&seq), ForwardMode::Training(&mut a))
            .unwrap()
            .to_vec2()
            .unwrap();
        let second: Vec<Vec<f32>> = classifier
            .forward(std::slice::from_ref(&seq), ForwardMode::Training(&mut b))
            .unwrap()
            .to_vec2()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_wrong_length_and_ids() {
        let (vocab, classifier) = setup_test_classifier();
        let short = SentenceEncoder::new(2).unwrap().encode("good", &vocab).unwrap();
        assert!(matches!(
            classifier.predict_proba(&short),
            Err(ClassifierError::ValidationError(_))
        ));
        assert!(classifier.predict_batch(&[]).is_err());
    }

    #[test]
    fn test_cross_entropy_of_uniform_logits() {
        let (_, classifier) = setup_test_classifier();
        let logits = Tensor::zeros((2, 3), candle_core::DType::F32, &Device::Cpu).unwrap();
        let labels = Label::from_indices(&[0, 2], 3).unwrap();
        let loss: f32 = classifier.cross_entropy(&logits, &labels).unwrap().to_scalar().unwrap();
        assert!((loss - 3f32.ln()).abs() < 1e-5);
    }
}
