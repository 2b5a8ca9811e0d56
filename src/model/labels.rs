//! Label Encoder
//!
//! Maps traffic situation names to class indices. Classes are kept sorted so
//! the same label set always encodes the same way.

use serde::{Deserialize, Serialize};

use super::ModelError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(labels: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = labels.into_iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();

        if classes.len() < 2 {
            return Err(ModelError::Invalid(format!(
                "need at least 2 classes, found {}",
                classes.len()
            )));
        }
        Ok(Self { classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn encode(&self, label: &str) -> Result<usize, ModelError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| ModelError::UnknownLabel(label.to_string()))
    }

    pub fn decode(&self, index: usize) -> Result<&str, ModelError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(ModelError::ClassOutOfRange(index, self.classes.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_sorts_and_dedups() {
        let encoder = LabelEncoder::fit(["normal", "heavy", "low", "high", "normal"]).unwrap();
        assert_eq!(encoder.classes, vec!["heavy", "high", "low", "normal"]);
    }

    #[test]
    fn test_encode_decode() {
        let encoder = LabelEncoder::fit(["normal", "heavy", "low", "high"]).unwrap();
        assert_eq!(encoder.encode("low").unwrap(), 2);
        assert_eq!(encoder.decode(1).unwrap(), "high");
        assert!(matches!(encoder.encode("jam"), Err(ModelError::UnknownLabel(_))));
        assert!(matches!(encoder.decode(4), Err(ModelError::ClassOutOfRange(4, 4))));
    }

    #[test]
    fn test_single_class_rejected() {
        assert!(LabelEncoder::fit(["low", "low"]).is_err());
    }
}
