//! Reader for pretrained word-vector tables.
//!
//! The expected format is the plain-text layout GloVe ships: one record per
//! line, a word followed by `D` whitespace-separated floating point
//! components. `D` is inferred from the first record and every later record
//! must agree with it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info};

use crate::classifier::ClassifierError;

/// An ordered table of `(word, vector)` records.
#[derive(Debug, Clone, Default)]
pub struct WordVectors {
    words: Vec<String>,
    data: Vec<f32>,
    index: HashMap<String, usize>,
    dim: usize,
}

impl WordVectors {
    /// Loads a vector table from a file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        info!("Loading word vectors from {:?}", path);
        let file = File::open(path)?;
        let vectors = Self::from_reader(BufReader::new(file))?;
        info!("Loaded {} word vectors of dimension {}", vectors.len(), vectors.dim());
        Ok(vectors)
    }

    /// Parses a vector table from any buffered reader. Blank lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ClassifierError> {
        let mut vectors = WordVectors::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            let mut fields = line.split_whitespace();
            let word = match fields.next() {
                Some(word) => word,
                None => continue,
            };
            let components = fields
                .map(|field| {
                    field.parse::<f32>().map_err(|e| ClassifierError::ParseError {
                        line: line_no,
                        message: format!("invalid component '{}' for '{}': {}", field, word, e),
                    })
                })
                .collect::<Result<Vec<f32>, _>>()?;
            if components.is_empty() {
                return Err(ClassifierError::ParseError {
                    line: line_no,
                    message: format!("word '{}' has no vector components", word),
                });
            }
            vectors.push(word, &components).map_err(|e| match e {
                ClassifierError::DimensionMismatch { word, expected, found } => ClassifierError::ParseError {
                    line: line_no,
                    message: format!("word '{}' has {} components, expected {}", word, found, expected),
                },
                other => other,
            })?;
        }
        debug!("Parsed {} records", vectors.len());
        Ok(vectors)
    }

    /// Appends a record. The first record fixes the dimension of the table.
    ///
    /// A repeated word keeps its first vector for [`WordVectors::get`] but the
    /// record itself is retained, so ambiguity is reported later by
    /// [`crate::VocabularyIndex::build`].
    pub fn push(&mut self, word: &str, vector: &[f32]) -> Result<(), ClassifierError> {
        if self.words.is_empty() {
            self.dim = vector.len();
        } else if vector.len() != self.dim {
            return Err(ClassifierError::DimensionMismatch {
                word: word.to_string(),
                expected: self.dim,
                found: vector.len(),
            });
        }
        let row = self.words.len();
        self.index.entry(word.to_string()).or_insert(row);
        self.words.push(word.to_string());
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Vector of the first record for `word`.
    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.index.get(word).map(|&row| self.row(row))
    }

    /// All records in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.words
            .iter()
            .enumerate()
            .map(move |(row, word)| (word.as_str(), self.row(row)))
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.dim..(row + 1) * self.dim]
    }
}
