//! Inference engine abstraction.

use async_trait::async_trait;
use std::path::Path;
use vqa_core::{AnswerResult, Result};

/// Answers a question about an image.
///
/// Implemented by [`ModelClient`](crate::ModelClient) in production and by
/// mocks in tests.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Runs one prediction. Failures surface as `Error::Inference`.
    async fn predict(&self, image_path: &Path, question: &str) -> Result<AnswerResult>;

    /// Whether the engine can serve predictions.
    fn is_ready(&self) -> bool;
}
