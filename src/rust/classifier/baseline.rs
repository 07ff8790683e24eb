use std::sync::Arc;

use log::info;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::embedding::EmbeddingTable;
use super::error::ClassifierError;
use super::utils::{argmax, softmax};
use crate::encoder::TokenSequence;
use crate::label::Label;

/// Baseline model: averages the word vectors of a sentence and applies a
/// single softmax layer.
///
/// Word order is ignored, which is exactly what the recurrent classifier is
/// meant to improve on ("not feeling happy" looks like "happy" here).
#[derive(Debug, Clone)]
pub struct AveragingClassifier {
    embeddings: Arc<EmbeddingTable>,
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl AveragingClassifier {
    pub fn new(
        embeddings: impl Into<Arc<EmbeddingTable>>,
        num_classes: usize,
        seed: u64,
    ) -> Result<Self, ClassifierError> {
        if num_classes < 2 {
            return Err(ClassifierError::ValidationError(format!(
                "num_classes must be at least 2, got {}",
                num_classes
            )));
        }
        let embeddings = embeddings.into();
        let dim = embeddings.dim();
        let bound = 1.0 / (dim as f32).sqrt();
        let mut rng = StdRng::seed_from_u64(seed);
        let weights = Array2::from_shape_fn((num_classes, dim), |_| rng.gen_range(-bound..bound));
        Ok(Self {
            embeddings,
            weights,
            bias: Array1::zeros(num_classes),
        })
    }

    pub fn num_classes(&self) -> usize {
        self.bias.len()
    }

    fn features(&self, sequence: &TokenSequence) -> Result<Array1<f32>, ClassifierError> {
        self.embeddings.average(sequence.as_slice())
    }

    pub fn predict_proba(&self, sequence: &TokenSequence) -> Result<Array1<f32>, ClassifierError> {
        let avg = self.features(sequence)?;
        Ok(softmax(&(self.weights.dot(&avg) + &self.bias)))
    }

    pub fn predict(&self, sequence: &TokenSequence) -> Result<Label, ClassifierError> {
        let probs = self.predict_proba(sequence)?;
        let best = argmax(&probs.to_vec())
            .ok_or_else(|| ClassifierError::ModelError("Prediction produced no finite score".into()))?;
        Label::new(best, self.num_classes())
    }

    /// Per-example stochastic gradient descent on the cross-entropy loss.
    /// Returns the mean loss of every epoch.
    pub fn train(
        &mut self,
        sequences: &[TokenSequence],
        labels: &[Label],
        epochs: usize,
        learning_rate: f32,
    ) -> Result<Vec<f32>, ClassifierError> {
        if sequences.len() != labels.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Got {} sequences but {} labels",
                sequences.len(),
                labels.len()
            )));
        }
        if sequences.is_empty() {
            return Err(ClassifierError::ValidationError("Training set cannot be empty".into()));
        }

        let features = sequences
            .iter()
            .map(|s| self.features(s))
            .collect::<Result<Vec<_>, _>>()?;
        let targets = labels
            .iter()
            .map(|l| l.one_hot(self.num_classes()).map(Array1::from))
            .collect::<Result<Vec<_>, _>>()?;

        let mut history = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            let mut total = 0.0;
            for (avg, target) in features.iter().zip(&targets) {
                let probs = softmax(&(self.weights.dot(avg) + &self.bias));
                total -= target
                    .iter()
                    .zip(probs.iter())
                    .map(|(&y, &p)| y * p.max(f32::MIN_POSITIVE).ln())
                    .sum::<f32>();

                let dz = &probs - target;
                let dw = dz.view().insert_axis(Axis(1)).dot(&avg.view().insert_axis(Axis(0)));
                self.weights.scaled_add(-learning_rate, &dw);
                self.bias.scaled_add(-learning_rate, &dz);
            }
            let mean = total / features.len() as f32;
            if epoch % 100 == 0 {
                info!("Baseline epoch {}: cost = {:.4}", epoch, mean);
            }
            history.push(mean);
        }
        Ok(history)
    }
}
