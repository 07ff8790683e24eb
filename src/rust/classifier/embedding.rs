use candle_core::{Device, Tensor};
use ndarray::{Array1, Array2, ArrayView1};
use log::info;

use super::error::ClassifierError;
use super::utils::average_vectors;
use crate::vectors::WordVectors;
use crate::vocabulary::{VocabularyIndex, PAD_ID};

/// Frozen lookup matrix of shape `(N + 1, D)` built from pretrained vectors.
///
/// Row `0` is all zeros and stands for padding or unknown words; row `id` is
/// the vector of the vocabulary word with that id. There is no way to mutate
/// the matrix after [`EmbeddingTable::build`] returns, which is what keeps it
/// out of the classifier's trainable set.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    matrix: Array2<f32>,
}

impl EmbeddingTable {
    /// Builds the table by copying `vector_of(word)` into row `id` for every
    /// vocabulary entry.
    ///
    /// # Errors
    /// - `BuildError` if the vocabulary is empty or a word has no vector
    /// - `DimensionMismatch` if two vectors disagree on their length
    pub fn build<'v, F>(vocabulary: &VocabularyIndex, vector_of: F) -> Result<Self, ClassifierError>
    where
        F: Fn(&str) -> Option<&'v [f32]>,
    {
        let mut rows = Vec::with_capacity(vocabulary.len());
        for (word, id) in vocabulary.iter() {
            let vector = vector_of(word).ok_or_else(|| {
                ClassifierError::BuildError(format!("No pretrained vector for vocabulary word '{}'", word))
            })?;
            rows.push((id, word, vector));
        }

        let dim = match rows.first() {
            Some((_, _, vector)) => vector.len(),
            None => return Err(ClassifierError::BuildError("Vocabulary is empty".into())),
        };
        if dim == 0 {
            return Err(ClassifierError::BuildError("Word vectors have no components".into()));
        }

        let mut matrix = Array2::<f32>::zeros((vocabulary.len() + 1, dim));
        for (id, word, vector) in rows {
            if vector.len() != dim {
                return Err(ClassifierError::DimensionMismatch {
                    word: word.to_string(),
                    expected: dim,
                    found: vector.len(),
                });
            }
            matrix.row_mut(id as usize).assign(&ArrayView1::from(vector));
        }

        info!("Built embedding table with {} rows of dimension {}", matrix.nrows(), dim);
        Ok(Self { matrix })
    }

    /// Convenience wrapper that takes vectors straight from a parsed table.
    pub fn from_word_vectors(
        vocabulary: &VocabularyIndex,
        vectors: &WordVectors,
    ) -> Result<Self, ClassifierError> {
        Self::build(vocabulary, |word| vectors.get(word))
    }

    /// Vector for `id`, defined for every id in `[0, N]`.
    pub fn lookup(&self, id: u32) -> Result<ArrayView1<'_, f32>, ClassifierError> {
        if id as usize >= self.matrix.nrows() {
            return Err(ClassifierError::IdOutOfRange {
                id,
                rows: self.matrix.nrows(),
            });
        }
        Ok(self.matrix.row(id as usize))
    }

    /// Mean of the vectors of the non-pad ids, or zeros if there are none.
    pub fn average(&self, ids: &[u32]) -> Result<Array1<f32>, ClassifierError> {
        let rows = ids
            .iter()
            .filter(|&&id| id != PAD_ID)
            .map(|&id| self.lookup(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(average_vectors(&rows, self.dim()))
    }

    /// Copies the matrix into a tensor that is never registered as a variable.
    pub(crate) fn to_tensor(&self, device: &Device) -> Result<Tensor, ClassifierError> {
        let tensor = Tensor::from_iter(self.matrix.iter().copied(), device)?
            .reshape((self.matrix.nrows(), self.matrix.ncols()))?;
        Ok(tensor)
    }

    /// Embedding dimension `D`.
    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    /// Number of rows, `N + 1`.
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }
}
