//! Sentence to fixed-length id sequence encoding.
//!
//! Sentences are lowercased and split on whitespace. Only words present in
//! the vocabulary contribute an id; everything else is dropped without
//! leaving a gap, so later known words move forward in the sequence. The
//! remaining positions hold the pad id.

use log::warn;
use tokenizers::normalizers::Lowercase;
use tokenizers::pre_tokenizers::whitespace::WhitespaceSplit;
use tokenizers::{NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

use crate::classifier::ClassifierError;
use crate::vocabulary::{VocabularyIndex, PAD_ID};

/// Exactly `max_len` vocabulary ids, padded with [`PAD_ID`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenSequence {
    ids: Vec<u32>,
}

impl TokenSequence {
    pub fn as_slice(&self) -> &[u32] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of leading non-pad ids.
    pub fn known_len(&self) -> usize {
        self.ids.iter().take_while(|&&id| id != PAD_ID).count()
    }

    pub fn into_inner(self) -> Vec<u32> {
        self.ids
    }
}

/// Converts sentences into [`TokenSequence`]s of a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceEncoder {
    max_len: usize,
}

impl SentenceEncoder {
    /// # Errors
    /// - `ValidationError` if `max_len` is zero
    pub fn new(max_len: usize) -> Result<Self, ClassifierError> {
        if max_len == 0 {
            return Err(ClassifierError::ValidationError("max_len must be at least 1".into()));
        }
        Ok(Self { max_len })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Lowercases `sentence` and splits it on whitespace.
    pub fn tokenize(sentence: &str) -> Result<Vec<String>, ClassifierError> {
        let mut normalized = NormalizedString::from(sentence);
        Lowercase
            .normalize(&mut normalized)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;
        let mut pretokenized = PreTokenizedString::from(normalized);
        WhitespaceSplit
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;
        Ok(pretokenized
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(token, _, _)| token.to_string())
            .collect())
    }

    /// Encodes one sentence.
    ///
    /// Known words beyond the first `max_len` are truncated and reported at
    /// warn level; nothing is written past the end of the sequence.
    pub fn encode(&self, sentence: &str, vocabulary: &VocabularyIndex) -> Result<TokenSequence, ClassifierError> {
        let mut ids = vec![PAD_ID; self.max_len];
        let mut cursor = 0;
        let mut dropped = 0;
        for token in Self::tokenize(sentence)? {
            let Some(id) = vocabulary.id_of(&token) else {
                continue;
            };
            if cursor < self.max_len {
                ids[cursor] = id;
                cursor += 1;
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(
                "Truncated {} known word(s) beyond max_len {} in: {}",
                dropped, self.max_len, sentence
            );
        }
        debug_assert_eq!(ids.len(), self.max_len);
        Ok(TokenSequence { ids })
    }

    /// Encodes every sentence, preserving order.
    pub fn encode_all<S: AsRef<str>>(
        &self,
        sentences: &[S],
        vocabulary: &VocabularyIndex,
    ) -> Result<Vec<TokenSequence>, ClassifierError> {
        sentences
            .iter()
            .map(|sentence| self.encode(sentence.as_ref(), vocabulary))
            .collect()
    }

    /// Largest whitespace token count over `corpus`, the usual choice of `max_len`.
    pub fn longest_sentence<S: AsRef<str>>(corpus: &[S]) -> Result<usize, ClassifierError> {
        let mut longest = 0;
        for sentence in corpus {
            longest = longest.max(Self::tokenize(sentence.as_ref())?.len());
        }
        Ok(longest)
    }
}
