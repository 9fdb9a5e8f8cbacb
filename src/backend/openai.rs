//! Chat-completions backend for OpenAI-compatible providers (Groq, OpenRouter,
//! or any custom base URL).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_GROQ_MODEL, DEFAULT_OPENROUTER_MODEL};

use super::{Backend, BackendError, Completion, TokenUsage};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const MAX_TOKENS: u32 = 800;

pub struct OpenAiCompatBackend {
    provider: String,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: String,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            temperature: 0.3,
            max_tokens: MAX_TOKENS,
            client: reqwest::Client::new(),
        }
    }

    pub fn groq(api_key: String, model: Option<String>) -> Self {
        Self::new(
            "groq",
            GROQ_BASE_URL,
            model.unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            api_key,
        )
    }

    pub fn openrouter(api_key: String, model: Option<String>) -> Self {
        Self::new(
            "openrouter",
            OPENROUTER_BASE_URL,
            model.unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
            api_key,
        )
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        }
    }

    fn parse_response(&self, resp: ChatResponse) -> Result<Completion> {
        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(BackendError::EmptyCompletion {
                provider: self.provider.clone(),
            }
            .into());
        }

        Ok(Completion {
            text,
            usage: resp.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}

#[async_trait]
impl Backend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn generate(&self, prompt: &str) -> Result<Completion> {
        let body = self.build_request(prompt);

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(BackendError::from_status(&self.provider, status, text).into());
        }

        let chat: ChatResponse = resp.json().await?;
        let completion = self.parse_response(chat)?;
        if let Some(usage) = completion.usage {
            debug!(
                provider = %self.provider,
                input = usage.input_tokens,
                output = usage.output_tokens,
                "token usage"
            );
        }
        Ok(completion)
    }
}

// --- API types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_tuning_and_prompt() {
        let backend = OpenAiCompatBackend::groq("k".to_string(), None)
            .with_temperature(0.9)
            .with_max_tokens(64);
        let body = serde_json::to_value(backend.build_request("plan it")).unwrap();
        assert_eq!(body["max_tokens"], 64);
        assert!((body["temperature"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "plan it");
    }

    #[test]
    fn presets_pick_provider_defaults() {
        let groq = OpenAiCompatBackend::groq("k".to_string(), None);
        assert_eq!(groq.name(), "groq");
        assert_eq!(groq.model(), DEFAULT_GROQ_MODEL);
        assert_eq!(groq.endpoint(), "https://api.groq.com/openai/v1/chat/completions");

        let router = OpenAiCompatBackend::openrouter("k".to_string(), Some("x/y".to_string()));
        assert_eq!(router.name(), "openrouter");
        assert_eq!(router.model(), "x/y");
    }

    #[test]
    fn trailing_slash_trimmed_from_base_url() {
        let backend = OpenAiCompatBackend::new("local", "http://localhost:8080/v1/", "m", String::new());
        assert_eq!(backend.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn parse_first_choice_with_usage() {
        let backend = OpenAiCompatBackend::groq("k".to_string(), None);
        let resp: ChatResponse = serde_json::from_str(
            r#"{
                "choices": [{"message": {"role": "assistant", "content": "Bonjour"}}],
                "usage": {"prompt_tokens": 40, "completion_tokens": 2, "total_tokens": 42}
            }"#,
        )
        .unwrap();
        let completion = backend.parse_response(resp).unwrap();
        assert_eq!(completion.text, "Bonjour");
        assert_eq!(completion.usage.unwrap().total(), 42);
    }

    #[test]
    fn parse_without_choices_is_empty_completion() {
        let backend = OpenAiCompatBackend::groq("k".to_string(), None);
        let resp: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = backend.parse_response(resp).unwrap_err();
        assert!(err.to_string().contains("empty completion"));
    }
}
