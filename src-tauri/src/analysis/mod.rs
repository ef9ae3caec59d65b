//! Analysis domain — text extraction, translation and keyword analysis.
//!
//! Public API for the remote side of the pipeline.
//!
//!   - gemini.rs  — Google Gemini `generateContent` client + response types
//!   - prompts.rs — instructions sent with each call
//!   - report.rs  — formats the three results into one display string

mod gemini;
pub mod prompts;
pub mod report;

pub use gemini::{encode_png, GeminiClient, GenerateContentResponse};
pub use prompts::NO_ANALYSIS_SENTINEL;
pub use report::format_report;

use crate::config::Credential;
use image::DynamicImage;
use std::future::Future;

/// The three remote operations the pipeline needs.
///
/// Each call is independent; the orchestrator decides the order and stops
/// at the first failure.
pub trait AnalysisClient: Send + Sync + 'static {
    /// Reads the text inside `image`.
    fn extract_text(
        &self,
        credential: &Credential,
        image: &DynamicImage,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Translates `text` into Portuguese.
    fn translate(
        &self,
        credential: &Credential,
        text: &str,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Lists keywords and related facts, or answers [`NO_ANALYSIS_SENTINEL`].
    fn extract_keywords(
        &self,
        credential: &Credential,
        text: &str,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Response contains no text")]
    NoText,

    #[error("Image encoding failed: {0}")]
    ImageEncoding(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ServiceError::MalformedResponse(e.to_string())
        } else {
            ServiceError::Http(e.to_string())
        }
    }
}
