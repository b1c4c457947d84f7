//! Inference output types.

use serde::{Deserialize, Serialize};

/// Structured output of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Predicted answer label
    pub answer: String,
    /// Softmax probability of the chosen answer, in [0, 1]
    pub answer_confidence: f32,
    /// Whether the model considers the question answerable from the image
    pub is_answerable: bool,
    /// Softmax probability of the answerability decision, in [0, 1]
    pub answerable_confidence: f32,
}

impl AnswerResult {
    pub fn new(
        answer: impl Into<String>,
        answer_confidence: f32,
        is_answerable: bool,
        answerable_confidence: f32,
    ) -> Self {
        Self {
            answer: answer.into(),
            answer_confidence: answer_confidence.clamp(0.0, 1.0),
            is_answerable,
            answerable_confidence: answerable_confidence.clamp(0.0, 1.0),
        }
    }
}
