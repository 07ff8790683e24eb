use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;

/// Number of emoji categories in the reference configuration.
pub const DEFAULT_NUM_CLASSES: usize = 5;

/// A category index in `[0, C)`.
///
/// The label itself is the source of truth; the one-hot vector used by the
/// loss is derived on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label(usize);

impl Label {
    /// # Errors
    /// - `ValidationError` if `value >= num_classes`
    pub fn new(value: usize, num_classes: usize) -> Result<Self, ClassifierError> {
        if value >= num_classes {
            return Err(ClassifierError::ValidationError(format!(
                "Label {} outside [0, {})",
                value, num_classes
            )));
        }
        Ok(Self(value))
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// One-hot view of length `num_classes`.
    ///
    /// # Errors
    /// - `ValidationError` if the label does not fit in `num_classes`
    pub fn one_hot(self, num_classes: usize) -> Result<Vec<f32>, ClassifierError> {
        Label::new(self.0, num_classes)?;
        let mut encoded = vec![0.0; num_classes];
        encoded[self.0] = 1.0;
        Ok(encoded)
    }

    /// Validates a batch of raw labels.
    pub fn from_indices(values: &[usize], num_classes: usize) -> Result<Vec<Self>, ClassifierError> {
        values.iter().map(|&v| Label::new(v, num_classes)).collect()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
