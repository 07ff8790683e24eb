use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::debug;
use sha2::{Digest, Sha256};

use crate::classifier::ClassifierError;
use crate::vectors::WordVectors;

/// Id reserved for padding and for words outside the vocabulary.
pub const PAD_ID: u32 = 0;

/// A fixed bijection between vocabulary words and dense ids in `[1, N]`.
///
/// Ids follow the order in which words were supplied. Id [`PAD_ID`] never
/// maps to a word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyIndex {
    word_to_id: HashMap<String, u32>,
    // id_to_word[id - 1] is the word for `id`
    id_to_word: Vec<String>,
}

impl VocabularyIndex {
    /// Builds the index from `(word, vector)` pairs.
    ///
    /// # Errors
    /// - `VocabularyError` if a word is supplied twice with different vectors.
    ///   A repeat with an identical vector is ignored.
    pub fn build<'a, I>(pairs: I) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32])>,
    {
        let mut first_seen: HashMap<&'a str, &'a [f32]> = HashMap::new();
        let mut vocab = VocabularyIndex::default();
        for (word, vector) in pairs {
            match first_seen.entry(word) {
                Entry::Occupied(existing) => {
                    if *existing.get() != vector {
                        return Err(ClassifierError::VocabularyError(format!(
                            "word '{}' appears twice with different vectors",
                            word
                        )));
                    }
                    debug!("Ignoring repeated record for '{}'", word);
                }
                Entry::Vacant(slot) => {
                    slot.insert(vector);
                    vocab.insert(word);
                }
            }
        }
        Ok(vocab)
    }

    /// Builds the index from every record of a vector table.
    pub fn from_word_vectors(vectors: &WordVectors) -> Result<Self, ClassifierError> {
        Self::build(vectors.iter())
    }

    /// Builds the index from bare words; repeats are ignored.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = VocabularyIndex::default();
        for word in words {
            if !vocab.word_to_id.contains_key(word.as_ref()) {
                vocab.insert(word.as_ref());
            }
        }
        vocab
    }

    fn insert(&mut self, word: &str) {
        self.id_to_word.push(word.to_string());
        let id = self.id_to_word.len() as u32;
        self.word_to_id.insert(word.to_string(), id);
    }

    #[inline]
    pub fn id_of(&self, word: &str) -> Option<u32> {
        self.word_to_id.get(word).copied()
    }

    #[inline]
    pub fn word_of(&self, id: u32) -> Option<&str> {
        if id == PAD_ID {
            return None;
        }
        self.id_to_word.get(id as usize - 1).map(String::as_str)
    }

    /// Number of words, which is also the largest id.
    #[inline]
    pub fn len(&self) -> usize {
        self.id_to_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_word.is_empty()
    }

    /// `(word, id)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.id_to_word
            .iter()
            .enumerate()
            .map(|(i, word)| (word.as_str(), i as u32 + 1))
    }

    /// SHA-256 over the words in id order. Two indexes with the same
    /// fingerprint assign the same id to every word.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for word in &self.id_to_word {
            hasher.update(word.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}
