use candle_core::Error as CandleError;
use std::fmt;
use std::io;

/// Represents the different types of errors that can occur while building, training or
/// running the emoji classifier.
#[derive(Debug)]
pub enum ClassifierError {
    /// The word-vector source is ambiguous (same word, different vectors)
    VocabularyError(String),
    /// Two word vectors disagree on their dimension
    DimensionMismatch {
        word: String,
        expected: usize,
        found: usize,
    },
    /// An id outside `[0, N]` was looked up in the embedding table
    IdOutOfRange { id: u32, rows: usize },
    /// Error occurred while normalizing or splitting a sentence
    TokenizerError(String),
    /// Error occurred inside the tensor backend
    ModelError(String),
    /// Error occurred during the build phase
    BuildError(String),
    /// Error occurred while training
    TrainingError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
    /// Malformed record in a vector table or labeled sentence file
    ParseError { line: usize, message: String },
    /// Error occurred while reading an input file
    IoError(io::Error),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VocabularyError(msg) => write!(f, "Vocabulary error: {}", msg),
            Self::DimensionMismatch { word, expected, found } => write!(
                f,
                "Dimension mismatch for '{}': expected {} components, found {}",
                word, expected, found
            ),
            Self::IdOutOfRange { id, rows } => write!(
                f,
                "Embedding id {} out of range (table has {} rows)",
                id, rows
            ),
            Self::TokenizerError(msg) => write!(f, "Tokenizer error: {}", msg),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
            Self::TrainingError(msg) => write!(f, "Training error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::ParseError { line, message } => write!(f, "Parse error on line {}: {}", line, message),
            Self::IoError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClassifierError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CandleError> for ClassifierError {
    fn from(err: CandleError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}

impl From<io::Error> for ClassifierError {
    fn from(err: io::Error) -> Self {
        ClassifierError::IoError(err)
    }
}
