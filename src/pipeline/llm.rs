//! LLM interaction: send the composed payload, return the report text.
//!
//! This module is intentionally thin — all prompt text lives in
//! [`crate::prompts`] and all orchestration in [`crate::analyze`]; here is
//! only the wire shape of the Gemini `generateContent` call and its error
//! mapping. One synchronous request, no retries, no streaming: a failed
//! generation surfaces as [`ThreatModelError::GenerationFailed`] and the
//! caller reports it.
//!
//! The API key travels in the request URL. Error paths deliberately avoid
//! echoing the URL (reqwest errors are stripped of it) so the key can never
//! end up in a user-facing message.

use crate::config::AnalysisConfig;
use crate::error::ThreatModelError;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// The composed request: rendered instruction text plus the uploaded
/// document, attached as binary rather than inlined as text.
#[derive(Debug, Clone)]
pub struct PromptPayload {
    /// Instruction template with the repository context substituted in.
    pub instruction: String,
    /// Raw bytes of the uploaded PDF.
    pub document: Vec<u8>,
}

/// Client for the Gemini `generateContent` API.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Build a client from the analysis configuration.
    pub fn new(config: &AnalysisConfig) -> Result<Self, ThreatModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ThreatModelError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Send the payload and return the raw report text.
    ///
    /// The response is consumed as-is: no parsing or validation of the
    /// report structure. An empty candidate set counts as a failure — a
    /// threat model with no text is not a result.
    pub async fn generate(&self, payload: &PromptPayload) -> Result<String, ThreatModelError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [
                        {"text": payload.instruction},
                        {
                            "inline_data": {
                                "mime_type": "application/pdf",
                                "data": base64::engine::general_purpose::STANDARD
                                    .encode(&payload.document),
                            }
                        }
                    ]
                }
            ],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        debug!(
            "Requesting threat model: model={}, instruction {} chars, document {} bytes",
            self.model,
            payload.instruction.len(),
            payload.document.len()
        );

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            // without_url: the request URL carries the API key.
            ThreatModelError::GenerationFailed {
                detail: e.without_url().to_string(),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ThreatModelError::GenerationFailed {
                detail: format!("HTTP {} {}", status, truncate(&body, 300)),
            });
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| ThreatModelError::GenerationFailed {
                    detail: format!("could not decode response: {}", e.without_url()),
                })?;

        let text = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .flat_map(|c| c.content.and_then(|c| c.parts).unwrap_or_default())
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(ThreatModelError::GenerationFailed {
                detail: "the model returned no text content".into(),
            });
        }

        Ok(text)
    }
}

/// Cap a diagnostic string at `max` characters, char-boundary safe.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}…")
    }
}
