//! Text-generation collaborator
//!
//! One structured-output request per chunk. The error classification
//! here drives the retriable/non-retriable split in the AI layer
//! runners: rate limits and timeouts abort the run for the workflow to
//! retry, everything else is contained to the failing chunk.

use crate::chunker::Chunk;
use crate::models::{Finding, Layer, Severity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tqa_common::config::AiConfig;
use uuid::Uuid;

/// Per-call token/cost accounting; written to the audit sink, never read
/// back by the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cost_usd += other.cost_usd;
    }
}

/// AI call failure classes
#[derive(Debug, Error)]
pub enum AiCallError {
    /// Provider-side rate limit; retriable at the workflow level
    #[error("provider rate limited: {0}")]
    RateLimited(String),

    /// Call timed out mid-flight; retriable at the workflow level
    #[error("call timed out: {0}")]
    Timeout(String),

    /// Response did not match the expected findings schema
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// Any other provider failure (auth, 5xx, malformed transport)
    #[error("provider error: {0}")]
    Provider(String),
}

impl AiCallError {
    /// Retriable errors abort the whole layer run and propagate to the
    /// workflow retry mechanism; the rest are contained per chunk.
    pub fn is_retriable(&self) -> bool {
        matches!(self, AiCallError::RateLimited(_) | AiCallError::Timeout(_))
    }
}

/// One finding returned by the model for a chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiFinding {
    pub segment_id: Uuid,
    pub category: String,
    pub severity: Severity,
    /// Model confidence; clamped into [0, 100] before persistence
    pub confidence: f64,
    pub description: String,
    #[serde(default)]
    pub suggested_fix: Option<String>,
    /// Present for the deep analysis pass only
    #[serde(default)]
    pub rationale: Option<String>,
}

/// One chunk review request
#[derive(Debug, Clone)]
pub struct ChunkReviewRequest {
    pub layer: Layer,
    pub source_language: String,
    pub target_language: String,
    pub chunk: Chunk,
    /// Prior layers' findings, sent as negative context so the model
    /// does not duplicate them
    pub prior_findings: Vec<Finding>,
}

/// Structured response for one chunk
#[derive(Debug, Clone)]
pub struct ChunkReviewResponse {
    pub findings: Vec<AiFinding>,
    pub usage: TokenUsage,
}

/// Text-generation collaborator contract
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn review_chunk(
        &self,
        request: &ChunkReviewRequest,
    ) -> Result<ChunkReviewResponse, AiCallError>;

    /// Resolved model identifier, reported in the layer run summary
    fn model_id(&self) -> String;
}

/// Production text generator over an OpenAI-compatible chat completions
/// endpoint
pub struct HttpTextGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    input_cost_per_1k: f64,
    output_cost_per_1k: f64,
}

impl HttpTextGenerator {
    pub fn new(config: &AiConfig, model: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model,
            input_cost_per_1k: config.input_cost_per_1k,
            output_cost_per_1k: config.output_cost_per_1k,
        }
    }

    fn build_prompt(request: &ChunkReviewRequest) -> String {
        let segments: Vec<serde_json::Value> = request
            .chunk
            .segments
            .iter()
            .map(|s| {
                json!({
                    "segmentId": s.id,
                    "source": s.source_text,
                    "target": s.target_text,
                })
            })
            .collect();

        let prior: Vec<serde_json::Value> = request
            .prior_findings
            .iter()
            .map(|f| {
                json!({
                    "segmentId": f.segment_id,
                    "category": f.category,
                    "severity": f.severity.as_str(),
                    "description": f.description,
                })
            })
            .collect();

        json!({
            "sourceLanguage": request.source_language,
            "targetLanguage": request.target_language,
            "segments": segments,
            "alreadyReported": prior,
        })
        .to_string()
    }

    fn system_prompt(layer: Layer) -> &'static str {
        match layer {
            Layer::L3 => {
                "You are a senior translation quality reviewer performing a deep analysis pass. \
                 Review each segment pair for accuracy, fluency, terminology, style and locale \
                 convention issues. Do not repeat any issue listed under alreadyReported. \
                 Respond with JSON: {\"findings\": [{\"segmentId\", \"category\", \"severity\" \
                 (critical|major|minor), \"confidence\" (0-100), \"description\", \
                 \"suggestedFix\", \"rationale\"}]}."
            }
            _ => {
                "You are a translation quality screener. Flag clear accuracy, omission and \
                 terminology issues in each segment pair. Do not repeat any issue listed under \
                 alreadyReported. Respond with JSON: {\"findings\": [{\"segmentId\", \
                 \"category\", \"severity\" (critical|major|minor), \"confidence\" (0-100), \
                 \"description\", \"suggestedFix\"}]}."
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
}

#[derive(Debug, Deserialize)]
struct FindingsPayload {
    findings: Vec<AiFinding>,
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn review_chunk(
        &self,
        request: &ChunkReviewRequest,
    ) -> Result<ChunkReviewResponse, AiCallError> {
        let body = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": Self::system_prompt(request.layer) },
                { "role": "user", "content": Self::build_prompt(request) },
            ],
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiCallError::Timeout(e.to_string())
                } else {
                    AiCallError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AiCallError::RateLimited(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiCallError::Provider(format!("HTTP {}: {}", status, text)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiCallError::Schema(format!("completion envelope: {}", e)))?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AiCallError::Schema("empty choices".to_string()))?;

        let payload: FindingsPayload = serde_json::from_str(content)
            .map_err(|e| AiCallError::Schema(format!("findings payload: {}", e)))?;

        let usage = completion.usage.unwrap_or_default();
        let cost_usd = usage.prompt_tokens as f64 / 1000.0 * self.input_cost_per_1k
            + usage.completion_tokens as f64 / 1000.0 * self.output_cost_per_1k;

        Ok(ChunkReviewResponse {
            findings: payload.findings,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                cost_usd,
            },
        })
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_classes() {
        assert!(AiCallError::RateLimited("429".into()).is_retriable());
        assert!(AiCallError::Timeout("deadline".into()).is_retriable());
        assert!(!AiCallError::Schema("bad json".into()).is_retriable());
        assert!(!AiCallError::Provider("500".into()).is_retriable());
    }

    #[test]
    fn findings_payload_parses_camel_case_schema() {
        let content = r#"{
            "findings": [{
                "segmentId": "6f0c2f9e-2b9a-4b5e-9a3f-111111111111",
                "category": "accuracy",
                "severity": "major",
                "confidence": 112.0,
                "description": "mistranslation of negation",
                "suggestedFix": "insert 'nicht'",
                "rationale": "the source negates the clause"
            }]
        }"#;
        let payload: FindingsPayload = serde_json::from_str(content).unwrap();
        assert_eq!(payload.findings.len(), 1);
        assert_eq!(payload.findings[0].severity, Severity::Major);
        assert_eq!(
            payload.findings[0].rationale.as_deref(),
            Some("the source negates the clause")
        );
    }
}
