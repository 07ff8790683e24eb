use std::time::Instant;

use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::classifier::{argmax, ClassifierError, ForwardMode, RecurrentClassifier};
use crate::encoder::TokenSequence;
use crate::label::Label;

/// Settings for [`Trainer`]. The defaults match the reference run: 50
/// epochs of 32-example minibatches, reshuffled every epoch, Adam at 1e-3.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub shuffle: bool,
    pub learning_rate: f64,
    /// Seeds both the shuffling order and the dropout masks
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            shuffle: true,
            learning_rate: 1e-3,
            seed: 0,
        }
    }
}

/// Mean loss and training accuracy of every epoch, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub epoch_losses: Vec<f32>,
    pub epoch_accuracies: Vec<f32>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.epoch_losses.last().copied()
    }

    pub fn final_accuracy(&self) -> Option<f32> {
        self.epoch_accuracies.last().copied()
    }
}

/// Minibatch Adam over a classifier's trainable parameters.
///
/// The embedding table is never handed to the optimizer, so it keeps the
/// exact values it was built with.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    /// # Errors
    /// - `ValidationError` for zero epochs, a zero batch size or a
    ///   non-positive learning rate
    pub fn new(config: TrainingConfig) -> Result<Self, ClassifierError> {
        if config.epochs == 0 {
            return Err(ClassifierError::ValidationError("epochs must be at least 1".into()));
        }
        if config.batch_size == 0 {
            return Err(ClassifierError::ValidationError("batch_size must be at least 1".into()));
        }
        if !(config.learning_rate > 0.0) {
            return Err(ClassifierError::ValidationError(format!(
                "learning_rate must be positive, got {}",
                config.learning_rate
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Runs exactly `epochs` passes over the data and returns the per-epoch
    /// history. Parameters are updated once per minibatch, after its forward
    /// and backward pass completed.
    pub fn train(
        &self,
        model: &mut RecurrentClassifier,
        sequences: &[TokenSequence],
        labels: &[Label],
    ) -> Result<TrainingReport, ClassifierError> {
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
        let num_classes = model.config().num_classes;
        if let Some(label) = labels.iter().find(|l| l.index() >= num_classes) {
            return Err(ClassifierError::ValidationError(format!(
                "Label {} outside [0, {})",
                label, num_classes
            )));
        }

        let params = ParamsAdamW {
            lr: self.config.learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-7,
            weight_decay: 0.0,
        };
        let mut optimizer = AdamW::new(model.trainable_parameters().all_vars(), params)
            .map_err(|e| ClassifierError::TrainingError(format!("Failed to create optimizer: {}", e)))?;

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut order: Vec<usize> = (0..sequences.len()).collect();
        let mut report = TrainingReport::default();
        info!(
            "Training on {} examples for {} epochs (batch size {})",
            sequences.len(),
            self.config.epochs,
            self.config.batch_size
        );

        for epoch in 1..=self.config.epochs {
            let epoch_start = Instant::now();
            if self.config.shuffle {
                order.shuffle(&mut rng);
            }

            let mut total_loss = 0.0f32;
            let mut correct = 0usize;
            for (batch_idx, chunk) in order.chunks(self.config.batch_size).enumerate() {
                let batch: Vec<TokenSequence> = chunk.iter().map(|&i| sequences[i].clone()).collect();
                let batch_labels: Vec<Label> = chunk.iter().map(|&i| labels[i]).collect();

                let logits = model.logits(&batch, ForwardMode::Training(&mut rng))?;
                let loss = model.cross_entropy(&logits, &batch_labels)?;
                optimizer
                    .backward_step(&loss)
                    .map_err(|e| ClassifierError::TrainingError(format!("Optimizer step failed: {}", e)))?;

                let batch_loss = loss.to_scalar::<f32>()?;
                total_loss += batch_loss * chunk.len() as f32;
                for (scores, label) in logits.to_vec2::<f32>()?.iter().zip(&batch_labels) {
                    if argmax(scores) == Some(label.index()) {
                        correct += 1;
                    }
                }
                debug!("Epoch {} batch {}: loss {:.6}", epoch, batch_idx, batch_loss);
            }

            let epoch_loss = total_loss / sequences.len() as f32;
            let epoch_accuracy = correct as f32 / sequences.len() as f32;
            info!(
                "Epoch {}/{} - loss: {:.4} - accuracy: {:.4} ({:.2?})",
                epoch,
                self.config.epochs,
                epoch_loss,
                epoch_accuracy,
                epoch_start.elapsed()
            );
            report.epoch_losses.push(epoch_loss);
            report.epoch_accuracies.push(epoch_accuracy);
        }

        Ok(report)
    }
}
