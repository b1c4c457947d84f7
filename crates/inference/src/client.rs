//! Model server client.
//!
//! Posts the image (base64) and question to `{url}/predict` and expects raw
//! logits back:
//!
//! ```json
//! { "answer_logits": [..], "answerable_logits": [unanswerable, answerable] }
//! ```

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use vqa_core::{AnswerResult, Error, Result};

use crate::config::InferenceConfig;
use crate::engine::InferenceEngine;
use crate::postprocess::decode;
use crate::vocab::AnswerVocab;

#[derive(Serialize)]
struct PredictRequest<'a> {
    question: &'a str,
    image_base64: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    answer_logits: Vec<f32>,
    answerable_logits: Vec<f32>,
}

/// Client for the out-of-process model server.
#[derive(Clone)]
pub struct ModelClient {
    /// Model server URL (e.g., "http://model:9000")
    base_url: String,
    http_client: reqwest::Client,
    vocab: Arc<AnswerVocab>,
    /// Answer locally without a model server (development)
    mock_mode: bool,
    /// Result of the last health check, shared between clones
    reachable: Arc<AtomicBool>,
}

impl ModelClient {
    /// Builds a client from config.
    ///
    /// A remote client needs a vocabulary file; mock mode falls back to the
    /// built-in vocabulary.
    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        let vocab = match &config.vocab_path {
            Some(path) => AnswerVocab::load(path)?,
            None if config.is_mock() => AnswerVocab::builtin(),
            None => return Err(Error::config("inference.vocab_path is required with a model server")),
        };
        Self::new(config, vocab)
    }

    pub fn new(config: &InferenceConfig, vocab: AnswerVocab) -> Result<Self> {
        let mock_mode = config.is_mock();
        let base_url = if mock_mode {
            String::new()
        } else {
            let parsed = url::Url::parse(config.url.trim())
                .map_err(|e| Error::config(format!("invalid inference url {:?}: {}", config.url, e)))?;
            parsed.as_str().trim_end_matches('/').to_string()
        };

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            http_client,
            vocab: Arc::new(vocab),
            mock_mode,
            reachable: Arc::new(AtomicBool::new(mock_mode)),
        })
    }

    pub fn is_mock(&self) -> bool {
        self.mock_mode
    }

    pub fn vocab(&self) -> &AnswerVocab {
        &self.vocab
    }

    /// Checks `{url}/health` and remembers the outcome for `is_ready`.
    /// Always true in mock mode.
    pub async fn check_connection(&self) -> bool {
        if self.mock_mode {
            return true;
        }

        let reachable = self.fetch_health().await;
        self.reachable.store(reachable, Ordering::Relaxed);
        reachable
    }

    async fn fetch_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.http_client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(url = %url, status = %resp.status(), "Model server health check failed");
                false
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Model server unreachable");
                false
            }
        }
    }

    async fn remote_predict(&self, image: Vec<u8>, question: &str) -> Result<AnswerResult> {
        let url = format!("{}/predict", self.base_url);
        let request = PredictRequest {
            question,
            image_base64: STANDARD.encode(image),
        };

        debug!(url = %url, "Calling model server");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::inference(format!("model server unavailable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::inference(format!(
                "model server returned {}: {}",
                status, body
            )));
        }

        let output: PredictResponse = response
            .json()
            .await
            .map_err(|e| Error::inference(format!("invalid model response: {}", e)))?;

        decode(&output.answer_logits, &output.answerable_logits, &self.vocab)
    }

    /// Deterministic logits derived from the question and image.
    fn mock_predict(&self, image: &[u8], question: &str) -> Result<AnswerResult> {
        debug!("Using mock inference");
        let (answer_logits, answerable_logits) = mock_logits(image, question, self.vocab.len());
        decode(&answer_logits, &answerable_logits, &self.vocab)
    }
}

#[async_trait]
impl InferenceEngine for ModelClient {
    async fn predict(&self, image_path: &Path, question: &str) -> Result<AnswerResult> {
        let image = tokio::fs::read(image_path).await.map_err(|e| {
            Error::inference(format!("failed to read image {}: {}", image_path.display(), e))
        })?;

        if self.mock_mode {
            self.mock_predict(&image, question)
        } else {
            self.remote_predict(image, question).await
        }
    }

    /// A remote client is ready once its last health check succeeded.
    fn is_ready(&self) -> bool {
        !self.vocab.is_empty() && self.reachable.load(Ordering::Relaxed)
    }
}

fn mock_logits(image: &[u8], question: &str, classes: usize) -> (Vec<f32>, Vec<f32>) {
    let mut hasher = DefaultHasher::new();
    question.trim().to_lowercase().hash(&mut hasher);
    image.hash(&mut hasher);
    let hash = hasher.finish();

    let chosen = (hash % classes as u64) as usize;
    let answer_logits = (0..classes)
        .map(|i| if i == chosen { 4.0 } else { 0.0 })
        .collect();
    let answerable_logits = if hash & 1 == 0 {
        vec![0.5, 2.5]
    } else {
        vec![2.5, 0.5]
    };
    (answer_logits, answerable_logits)
}
