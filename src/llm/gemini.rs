//! Gemini API client
//!
//! Uses a long-lived reqwest::Client for connection pooling. Structured
//! requests attach the contract as `responseSchema` and ask for JSON.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::LlmSettings;
use crate::contract::extract_json;
use crate::error::OrchestrationError;
use crate::llm::{Generated, GenerationRequest, Generator};
use crate::Result;

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            endpoint: format!("{}/{}:generateContent", settings.base_url, settings.model),
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        })
    }

    fn build_request(&self, request: &GenerationRequest<'_>) -> GeminiRequest {
        let (response_mime_type, response_schema) = match request.contract {
            Some(contract) => (
                Some("application/json".to_string()),
                Some(contract.response_schema()),
            ),
            None => (None, None),
        };

        GeminiRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: self.max_output_tokens,
                response_mime_type,
                response_schema,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: request.system_instruction.to_string(),
                }],
            },
        }
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generated> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::ConfigError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let body = self.build_request(&request);

        debug!(
            endpoint = %self.endpoint,
            structured = request.contract.is_some(),
            "Calling Gemini API"
        );

        // The key travels in a header so reqwest errors, which echo the URL, never carry it.
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                OrchestrationError::HttpError(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Gemini API error response: {}", error_text);
            return Err(OrchestrationError::LlmStatus {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to parse Gemini response: {}", e);
            OrchestrationError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        let candidate = gemini_response.candidates.first().ok_or_else(|| {
            OrchestrationError::LlmError("No candidates in Gemini response".to_string())
        })?;

        let text: String = candidate
            .content
            .as_ref()
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(OrchestrationError::LlmError(format!(
                "Empty response from Gemini (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        if let Some(usage) = &gemini_response.usage_metadata {
            info!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini response received"
            );
        }

        if request.contract.is_some() {
            extract_json(&text).map(Generated::Structured)
        } else {
            Ok(Generated::Text(text))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
}
