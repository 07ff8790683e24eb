//! Labeled sentence files.
//!
//! Each line holds a sentence in the first column and an integer label in the
//! second; any further columns are ignored. Fields may be wrapped in double
//! quotes, with `""` standing for a literal quote.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::classifier::ClassifierError;
use crate::label::Label;

/// Sentences and their labels, kept in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledSentences {
    sentences: Vec<String>,
    labels: Vec<Label>,
}

impl LabeledSentences {
    pub fn from_file<P: AsRef<Path>>(path: P, num_classes: usize) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let data = Self::from_reader(BufReader::new(file), num_classes)?;
        info!("Read {} labeled sentences from {:?}", data.len(), path);
        Ok(data)
    }

    /// # Errors
    /// - `ParseError` for a line with fewer than two columns or a non-integer label
    /// - `ValidationError` for a label outside `[0, num_classes)`
    pub fn from_reader<R: BufRead>(reader: R, num_classes: usize) -> Result<Self, ClassifierError> {
        let mut data = LabeledSentences::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = i + 1;
            let fields = split_fields(&line);
            if fields.len() < 2 {
                return Err(ClassifierError::ParseError {
                    line: line_no,
                    message: "expected a sentence and a label".into(),
                });
            }
            let value = fields[1].trim().parse::<usize>().map_err(|e| ClassifierError::ParseError {
                line: line_no,
                message: format!("invalid label '{}': {}", fields[1], e),
            })?;
            data.push(fields[0].trim(), Label::new(value, num_classes)?);
        }
        Ok(data)
    }

    pub fn push(&mut self, sentence: impl Into<String>, label: Label) {
        self.sentences.push(sentence.into());
        self.labels.push(label);
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Label)> + '_ {
        self.sentences
            .iter()
            .map(String::as_str)
            .zip(self.labels.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_sentences_and_labels() {
        let csv = "never talk to me again,3,,,\nI am proud of your achievements,2,,\n\nIt is the worst day in my life,3\n";
        let data = LabeledSentences::from_reader(csv.as_bytes(), 5).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.sentences()[1], "I am proud of your achievements");
        assert_eq!(data.labels()[2].index(), 3);
    }

    #[test]
    fn test_quoted_sentence_with_comma() {
        let csv = "\"Yes, I \"\"really\"\" do\",0\n";
        let data = LabeledSentences::from_reader(csv.as_bytes(), 5).unwrap();
        assert_eq!(data.sentences()[0], "Yes, I \"really\" do");
    }

    #[test]
    fn test_bad_label() {
        let err = LabeledSentences::from_reader("hello,x\n".as_bytes(), 5).unwrap_err();
        assert!(matches!(err, ClassifierError::ParseError { line: 1, .. }));
        let err = LabeledSentences::from_reader("hello,9\n".as_bytes(), 5).unwrap_err();
        assert!(matches!(err, ClassifierError::ValidationError(_)));
        let err = LabeledSentences::from_reader("just a sentence\n".as_bytes(), 5).unwrap_err();
        assert!(matches!(err, ClassifierError::ParseError { .. }));
    }
}
