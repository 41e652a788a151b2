//! Gemini extraction client
//!
//! Calls the `generateContent` endpoint with a system instruction that
//! asks for one fragment of nodes and relationships as JSON. All wire
//! types are private to this module — callers only see raw response
//! text, which the batch processor repairs and parses.

use super::{ExtractionClient, ExtractionError};
use crate::pipeline::ChunkRow;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

const SYSTEM_INSTRUCTION: &str = "\
You are a literary knowledge graph generator. From the given chunk of a \
novel, extract entities and relations as a single JSON object with two \
keys: \"nodes\" and \"relationships\". Each node has an integer \"id\" \
unique within this response, a \"label\" (Actor, Object, Location, \
Event, Intangible), a \"name\", and optionally a \"description\". Each \
relationship has \"start_id\" and \"end_id\" referencing node ids from \
this response, a \"type\" in UPPER_SNAKE_CASE, and optionally a \
\"weight\" between 0 and 1. Output only the JSON object.";

/// Configuration for the Gemini client.
///
/// The API key is passed explicitly — the client never reads the
/// environment.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 60,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Client for the Gemini `generateContent` API.
///
/// Cheap to clone — `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ExtractionError> {
        if config.api_key.is_empty() {
            return Err(ExtractionError::MissingApiKey);
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint, self.config.model
        )
    }

    fn user_prompt(row: &ChunkRow) -> String {
        format!(
            "Author: {}\nBook: {}\nChapter: {}\nchunk_order_number: {}\nChunk: {}\nDatetime: {}",
            row.author,
            row.book,
            row.chapter,
            row.chunk_order_number,
            row.chunk,
            chrono::Utc::now().to_rfc3339(),
        )
    }
}

#[async_trait]
impl ExtractionClient for GeminiClient {
    /// Lightweight reachability probe: any HTTP response counts as
    /// reachable, only transport failures do not.
    async fn is_available(&self) -> bool {
        self.client
            .head(&self.config.endpoint)
            .send()
            .await
            .is_ok()
    }

    async fn extract(&self, row: &ChunkRow) -> Result<String, ExtractionError> {
        let payload = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Self::user_prompt(row),
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        debug!(
            model = %self.config.model,
            chunk_order_number = row.chunk_order_number,
            chunk_len = row.chunk.len(),
            "sending extraction request"
        );

        let response = self
            .client
            .post(self.request_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Response(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body: GenerateContentResponse = response.json().await?;
        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ExtractionError::Response("no candidates returned".to_string()))
    }
}

// ── Wire types ──

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
