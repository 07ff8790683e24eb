use std::fmt;

use log::{debug, info};
use ndarray::Array2;

use crate::classifier::{argmax, AveragingClassifier, ClassifierError, RecurrentClassifier};
use crate::dataset::LabeledSentences;
use crate::encoder::{SentenceEncoder, TokenSequence};
use crate::label::Label;
use crate::vocabulary::VocabularyIndex;

const EVAL_BATCH_SIZE: usize = 128;

/// Anything that scores encoded sentences over a fixed set of classes.
pub trait SequenceClassifier {
    fn num_classes(&self) -> usize;

    /// One score row per sequence, in inference mode.
    fn class_scores(&self, sequences: &[TokenSequence]) -> Result<Vec<Vec<f32>>, ClassifierError>;
}

impl SequenceClassifier for RecurrentClassifier {
    fn num_classes(&self) -> usize {
        self.config().num_classes
    }

    fn class_scores(&self, sequences: &[TokenSequence]) -> Result<Vec<Vec<f32>>, ClassifierError> {
        self.predict_batch(sequences)
    }
}

impl SequenceClassifier for AveragingClassifier {
    fn num_classes(&self) -> usize {
        AveragingClassifier::num_classes(self)
    }

    fn class_scores(&self, sequences: &[TokenSequence]) -> Result<Vec<Vec<f32>>, ClassifierError> {
        sequences
            .iter()
            .map(|s| self.predict_proba(s).map(|p| p.to_vec()))
            .collect()
    }
}

/// Counts of `(actual, predicted)` label pairs. Rows are actual labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        Self {
            counts: Array2::zeros((num_classes, num_classes)),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.counts.nrows()
    }

    pub fn record(&mut self, actual: Label, predicted: Label) -> Result<(), ClassifierError> {
        let n = self.num_classes();
        if actual.index() >= n || predicted.index() >= n {
            return Err(ClassifierError::ValidationError(format!(
                "Label pair ({}, {}) outside a {}-class matrix",
                actual, predicted, n
            )));
        }
        self.counts[[actual.index(), predicted.index()]] += 1;
        Ok(())
    }

    pub fn count(&self, actual: Label, predicted: Label) -> usize {
        self.counts
            .get([actual.index(), predicted.index()])
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    pub fn correct(&self) -> usize {
        self.counts.diag().sum()
    }

    pub fn as_array(&self) -> &Array2<usize> {
        &self.counts
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actual\\pred")?;
        for c in 0..self.num_classes() {
            write!(f, "{:>6}", c)?;
        }
        writeln!(f)?;
        for (actual, row) in self.counts.rows().into_iter().enumerate() {
            write!(f, "{:>11}", actual)?;
            for count in row {
                write!(f, "{:>6}", count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A sentence the model got wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mislabeled<'d> {
    pub sentence: &'d str,
    pub expected: Label,
    pub predicted: Label,
}

/// Outcome of scoring a labeled set.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accuracy: f32,
    pub predictions: Vec<Label>,
    pub confusion: ConfusionMatrix,
}

impl Evaluation {
    /// Pairs the predictions back with the sentences they were made for and
    /// keeps the wrong ones, in dataset order.
    pub fn mislabeled<'d>(&self, data: &'d LabeledSentences) -> Vec<Mislabeled<'d>> {
        data.iter()
            .zip(&self.predictions)
            .filter(|((_, expected), predicted)| expected != *predicted)
            .map(|((sentence, expected), &predicted)| Mislabeled {
                sentence,
                expected,
                predicted,
            })
            .collect()
    }
}

/// Inference-mode prediction and accuracy reporting for a trained model.
pub struct Evaluator<'a, M: SequenceClassifier> {
    model: &'a M,
    vocabulary: &'a VocabularyIndex,
    encoder: SentenceEncoder,
}

impl<'a> Evaluator<'a, RecurrentClassifier> {
    /// Evaluator whose encoder matches the classifier's sequence length.
    pub fn for_recurrent(
        model: &'a RecurrentClassifier,
        vocabulary: &'a VocabularyIndex,
    ) -> Result<Self, ClassifierError> {
        let encoder = SentenceEncoder::new(model.config().max_len)?;
        Ok(Self::new(model, vocabulary, encoder))
    }
}

impl<'a, M: SequenceClassifier> Evaluator<'a, M> {
    pub fn new(model: &'a M, vocabulary: &'a VocabularyIndex, encoder: SentenceEncoder) -> Self {
        Self {
            model,
            vocabulary,
            encoder,
        }
    }

    pub fn encoder(&self) -> &SentenceEncoder {
        &self.encoder
    }

    fn label_of(&self, scores: &[f32]) -> Result<Label, ClassifierError> {
        let best = argmax(scores)
            .ok_or_else(|| ClassifierError::ModelError("Prediction produced no finite score".into()))?;
        Label::new(best, self.model.num_classes())
    }

    /// Arg-max label of an already encoded sentence; ties go to the lowest label.
    pub fn predict_encoded(&self, sequence: &TokenSequence) -> Result<Label, ClassifierError> {
        let scores = self.model.class_scores(std::slice::from_ref(sequence))?;
        let row = scores
            .first()
            .ok_or_else(|| ClassifierError::ModelError("Empty prediction batch".into()))?;
        self.label_of(row)
    }

    /// Predicted label together with the full probability vector.
    pub fn predict_with_scores(&self, sentence: &str) -> Result<(Label, Vec<f32>), ClassifierError> {
        let sequence = self.encoder.encode(sentence, self.vocabulary)?;
        let mut scores = self.model.class_scores(std::slice::from_ref(&sequence))?;
        let row = scores
            .pop()
            .ok_or_else(|| ClassifierError::ModelError("Empty prediction batch".into()))?;
        let label = self.label_of(&row)?;
        debug!("Predicted {} for: {}", label, sentence);
        Ok((label, row))
    }

    pub fn predict(&self, sentence: &str) -> Result<Label, ClassifierError> {
        self.predict_with_scores(sentence).map(|(label, _)| label)
    }

    /// Fraction of `labels` matched by the arg-max prediction, plus the
    /// per-example predictions and their confusion matrix.
    ///
    /// # Errors
    /// - `ValidationError` if the inputs are empty or differ in length
    pub fn evaluate(&self, sequences: &[TokenSequence], labels: &[Label]) -> Result<Evaluation, ClassifierError> {
        if sequences.len() != labels.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Got {} sequences but {} labels",
                sequences.len(),
                labels.len()
            )));
        }
        if sequences.is_empty() {
            return Err(ClassifierError::ValidationError("Cannot evaluate an empty set".into()));
        }

        let mut predictions = Vec::with_capacity(sequences.len());
        for chunk in sequences.chunks(EVAL_BATCH_SIZE) {
            for row in self.model.class_scores(chunk)? {
                predictions.push(self.label_of(&row)?);
            }
        }

        let mut confusion = ConfusionMatrix::new(self.model.num_classes());
        for (&actual, &predicted) in labels.iter().zip(&predictions) {
            confusion.record(actual, predicted)?;
        }
        let accuracy = confusion.correct() as f32 / sequences.len() as f32;
        info!("Accuracy: {:.4} ({}/{})", accuracy, confusion.correct(), sequences.len());

        Ok(Evaluation {
            accuracy,
            predictions,
            confusion,
        })
    }

    /// Encodes and evaluates a labeled sentence set.
    pub fn evaluate_sentences(&self, data: &LabeledSentences) -> Result<Evaluation, ClassifierError> {
        let sequences = self.encoder.encode_all(data.sentences(), self.vocabulary)?;
        self.evaluate(&sequences, data.labels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScores(Vec<f32>);

    impl SequenceClassifier for FixedScores {
        fn num_classes(&self) -> usize {
            self.0.len()
        }

        fn class_scores(&self, sequences: &[TokenSequence]) -> Result<Vec<Vec<f32>>, ClassifierError> {
            Ok(vec![self.0.clone(); sequences.len()])
        }
    }

    #[test]
    fn test_tie_breaks_to_lowest_label() {
        let model = FixedScores(vec![0.1, 0.4, 0.1, 0.4]);
        let vocab = VocabularyIndex::from_words(["hi"]);
        let evaluator = Evaluator::new(&model, &vocab, SentenceEncoder::new(3).unwrap());
        assert_eq!(evaluator.predict("hi there").unwrap().index(), 1);
    }

    #[test]
    fn test_evaluate_counts_matches() {
        let model = FixedScores(vec![0.2, 0.8]);
        let vocab = VocabularyIndex::from_words(["a"]);
        let encoder = SentenceEncoder::new(2).unwrap();
        let evaluator = Evaluator::new(&model, &vocab, encoder);
        let sequences = encoder.encode_all(&["a", "a", "a", "a"], &vocab).unwrap();
        let labels = Label::from_indices(&[1, 0, 1, 1], 2).unwrap();

        let evaluation = evaluator.evaluate(&sequences, &labels).unwrap();
        assert!((evaluation.accuracy - 0.75).abs() < 1e-6);
        let zero = Label::new(0, 2).unwrap();
        let one = Label::new(1, 2).unwrap();
        assert_eq!(evaluation.confusion.count(one, one), 3);
        assert_eq!(evaluation.confusion.count(zero, one), 1);
        assert_eq!(evaluation.confusion.total(), 4);
    }

    #[test]
    fn test_evaluate_rejects_bad_input() {
        let model = FixedScores(vec![0.5, 0.5]);
        let vocab = VocabularyIndex::from_words(["a"]);
        let encoder = SentenceEncoder::new(2).unwrap();
        let evaluator = Evaluator::new(&model, &vocab, encoder);
        assert!(evaluator.evaluate(&[], &[]).is_err());
        let sequences = encoder.encode_all(&["a"], &vocab).unwrap();
        assert!(evaluator.evaluate(&sequences, &[]).is_err());
    }

    #[test]
    fn test_mislabeled_keeps_dataset_order() {
        let model = FixedScores(vec![0.9, 0.1]);
        let vocab = VocabularyIndex::from_words(["a"]);
        let evaluator = Evaluator::new(&model, &vocab, SentenceEncoder::new(2).unwrap());
        let data = LabeledSentences::from_reader("first,1\nsecond,0\nthird,1\n".as_bytes(), 2).unwrap();

        let evaluation = evaluator.evaluate_sentences(&data).unwrap();
        let wrong = evaluation.mislabeled(&data);
        assert_eq!(wrong.len(), 2);
        assert_eq!(wrong[0].sentence, "first");
        assert_eq!(wrong[1].sentence, "third");
        assert_eq!(wrong[1].predicted.index(), 0);
    }

    #[test]
    fn test_confusion_display() {
        let mut matrix = ConfusionMatrix::new(2);
        matrix.record(Label::new(0, 2).unwrap(), Label::new(1, 2).unwrap()).unwrap();
        let rendered = matrix.to_string();
        assert_eq!(rendered.lines().count(), 3);
        assert!(matrix.record(Label::new(2, 3).unwrap(), Label::new(0, 3).unwrap()).is_err());
    }
}
