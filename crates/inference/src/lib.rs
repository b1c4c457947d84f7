//! Inference for the VQA backend.
//!
//! The model itself runs out of process. [`ModelClient`] ships the image and
//! question to it, and turns the returned logits into an [`AnswerResult`]
//! using the answer vocabulary loaded at startup.
//!
//! [`AnswerResult`]: vqa_core::AnswerResult

pub mod client;
pub mod config;
pub mod engine;
pub mod postprocess;
pub mod vocab;

pub use client::ModelClient;
pub use config::InferenceConfig;
pub use engine::InferenceEngine;
pub use vocab::AnswerVocab;
