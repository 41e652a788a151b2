//! Extraction-client boundary
//!
//! Defines the client trait for turning one chunk of novel text into a
//! raw `kg_json` fragment, plus a mock for tests. The client is opaque
//! to the pipeline: it returns text that may be malformed JSON or fail
//! outright, and the batch processor deals with both.

mod gemini;

pub use gemini::{GeminiClient, GeminiConfig};

use crate::pipeline::ChunkRow;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from extraction-client operations.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction service unavailable: {0}")]
    Unavailable(String),
    #[error("missing API key")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Response(String),
}

/// Client trait for the generative extraction service.
///
/// Abstracts over transport (HTTP, mock) so the pipeline and CLI don't
/// depend on how the service is reached.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Check if the service is reachable.
    async fn is_available(&self) -> bool;

    /// Extract a raw graph fragment for one chunk.
    ///
    /// Returns the raw response text — one serialized fragment or an
    /// array of fragments. No repair or validation happens here.
    async fn extract(&self, row: &ChunkRow) -> Result<String, ExtractionError>;
}

/// Mock client for testing — returns scripted responses in order.
pub struct MockClient {
    available: bool,
    responses: Mutex<VecDeque<Result<String, ExtractionError>>>,
}

impl MockClient {
    /// Create a mock client that reports as available.
    pub fn available() -> Self {
        Self {
            available: true,
            responses: Mutex::new(VecDeque::new()),
        }
    }

    /// Create a mock client that reports as unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            responses: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a response; responses are consumed in FIFO order.
    pub fn with_response(self, response: Result<String, ExtractionError>) -> Self {
        self.responses
            .lock()
            .expect("mock lock")
            .push_back(response);
        self
    }
}

#[async_trait]
impl ExtractionClient for MockClient {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn extract(&self, _row: &ChunkRow) -> Result<String, ExtractionError> {
        self.responses
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(ExtractionError::Response(
                    "no scripted response left".to_string(),
                ))
            })
    }
}
