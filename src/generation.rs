//! Text-generation collaborator: summaries, case metadata, and query
//! reformulation.
//!
//! Every use is best-effort. Callers check [`TextGenerator::is_enabled`]
//! and fall back (extractive summary, empty metadata, original query) when
//! the generator is disabled or returns an error.
//!
//! # Retry Strategy
//!
//! The OpenAI-compatible client retries transient failures with
//! exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::models::CaseMetadata;

const SUMMARY_PROMPT: &str = "You summarize court judgements for lawyers. \
    Reply with a neutral summary of at most five sentences covering the dispute, \
    the holding, and the outcome.";

const METADATA_PROMPT: &str = "You read the opening of a court judgement. \
    Reply with only a JSON object with the string keys \"title\", \"date\", \
    \"parties\" and \"court\". Use an empty string for anything not stated.";

const REFORMULATE_PROMPT: &str = "Rewrite the user's legal research question as \
    a short space-separated list of the most important search keywords, most \
    important first. Reply with the keywords only.";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }

    async fn summarize(&self, text: &str) -> Result<String>;

    async fn extract_case_metadata(&self, text: &str) -> Result<CaseMetadata>;

    async fn reformulate_query(&self, query: &str) -> Result<String>;
}

/// Generator used when `generation.provider = "disabled"`.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn summarize(&self, _text: &str) -> Result<String> {
        bail!("text generation is disabled")
    }

    async fn extract_case_metadata(&self, _text: &str) -> Result<CaseMetadata> {
        bail!("text generation is disabled")
    }

    async fn reformulate_query(&self, _query: &str) -> Result<String> {
        bail!("text generation is disabled")
    }
}

/// Client for an OpenAI-compatible `POST {base_url}/chat/completions`.
///
/// Reads the API key from `OPENAI_API_KEY`.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &GenerationConfig, api_key: String) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            model,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: config.max_retries,
        })
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        let url = format!("{}/chat/completions", self.base_url);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        tracing::warn!(%status, attempt, "generation request failed, retrying");
                        last_err = Some(anyhow::anyhow!(
                            "chat completion error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("chat completion error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("chat completion failed after retries")))
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let summary = self.chat(SUMMARY_PROMPT, text).await?;
        if summary.trim().is_empty() {
            bail!("empty summary from {}", self.model);
        }
        Ok(summary.trim().to_string())
    }

    async fn extract_case_metadata(&self, text: &str) -> Result<CaseMetadata> {
        let reply = self.chat(METADATA_PROMPT, text).await?;
        parse_metadata(&reply)
    }

    async fn reformulate_query(&self, query: &str) -> Result<String> {
        let reply = self.chat(REFORMULATE_PROMPT, query).await?;
        if reply.trim().is_empty() {
            bail!("empty reformulation from {}", self.model);
        }
        Ok(reply.trim().to_string())
    }
}

/// Build the generator selected by `[generation]`.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "openai" => Ok(Box::new(OpenAiGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid chat response: missing choices[0].message.content"))
}

/// Parse a metadata reply, tolerating Markdown code fences and surrounding prose.
pub fn parse_metadata(reply: &str) -> Result<CaseMetadata> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        bail!("no JSON object in metadata reply");
    };
    if end < start {
        bail!("no JSON object in metadata reply");
    }
    let metadata: CaseMetadata = serde_json::from_str(&reply[start..=end])?;
    Ok(metadata)
}
