//! Core types, errors, and limits for the visual question answering backend.

pub mod answer;
pub mod error;
pub mod limits;
pub mod session;

pub use answer::*;
pub use error::{Error, ErrorCode, Result};
pub use session::*;
