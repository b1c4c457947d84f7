//! Answer vocabulary: a fixed, ordered index -> label table.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use vqa_core::{Error, Result};

/// Labels used when running without a model server.
const BUILTIN_LABELS: &[&str] = &["yes", "no", "unanswerable", "unsuitable", "white", "black"];

/// On-disk vocabulary formats.
#[derive(Deserialize)]
#[serde(untagged)]
enum VocabFile {
    /// `{"idx_to_answer": {"0": "yes", "1": "no"}}`
    Indexed { idx_to_answer: HashMap<String, String> },
    /// `{"answers": ["yes", "no"]}`
    Listed { answers: Vec<String> },
}

/// Immutable answer vocabulary, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerVocab {
    labels: Vec<String>,
}

impl AnswerVocab {
    pub fn from_labels(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::config("answer vocabulary is empty"));
        }
        Ok(Self { labels })
    }

    /// Small vocabulary for mock mode.
    pub fn builtin() -> Self {
        Self {
            labels: BUILTIN_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parses either vocabulary format. Indexed keys must be exactly `0..n`.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: VocabFile = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid answer vocabulary: {}", e)))?;

        match file {
            VocabFile::Listed { answers } => Self::from_labels(answers),
            VocabFile::Indexed { idx_to_answer } => {
                let mut slots: Vec<Option<String>> = vec![None; idx_to_answer.len()];
                for (key, label) in idx_to_answer {
                    let idx: usize = key
                        .parse()
                        .map_err(|_| Error::config(format!("vocabulary index {:?} is not a number", key)))?;
                    let slot = slots.get_mut(idx).ok_or_else(|| {
                        Error::config(format!("vocabulary index {} leaves a gap", idx))
                    })?;
                    *slot = Some(label);
                }
                // Duplicate numeric keys ("1" and "01") leave a hole behind.
                let labels = slots
                    .into_iter()
                    .enumerate()
                    .map(|(idx, label)| {
                        label.ok_or_else(|| Error::config(format!("vocabulary index {} is missing", idx)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::from_labels(labels)
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read vocabulary {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
