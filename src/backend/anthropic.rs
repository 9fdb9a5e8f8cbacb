use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::DEFAULT_ANTHROPIC_MODEL;

use super::{Backend, BackendError, Completion, TokenUsage};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;
const PROVIDER: &str = "anthropic";

/// A backend that calls the Anthropic Messages API with a single user turn.
pub struct AnthropicBackend {
    model: String,
    api_key: String,
    temperature: f32,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            model: model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            api_key,
            temperature: 0.3,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        }
    }

    fn parse_response(resp: ApiResponse) -> Result<Completion> {
        let text: String = resp
            .content
            .iter()
            .filter_map(|block| {
                if block.content_type == "text" {
                    block.text.as_deref()
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(BackendError::EmptyCompletion {
                provider: PROVIDER.to_string(),
            }
            .into());
        }

        Ok(Completion {
            text,
            usage: resp.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        })
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str) -> Result<Completion> {
        let body = self.build_request(prompt);

        let resp = self
            .client
            .post(API_URL)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(BackendError::from_status(PROVIDER, status, text).into());
        }

        let api_resp: ApiResponse = resp.json().await?;
        let completion = Self::parse_response(api_resp)?;
        if let Some(usage) = completion.usage {
            debug!(
                input = usage.input_tokens,
                output = usage.output_tokens,
                "anthropic token usage"
            );
        }
        Ok(completion)
    }
}

// --- API types ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
