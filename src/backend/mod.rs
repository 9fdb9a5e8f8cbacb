pub mod anthropic;
pub mod human;
pub mod mock;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

/// Token usage from a single generation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another usage into this one.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    /// Total tokens (input + output).
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// What a backend hands back for one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Failures a backend can report in a form callers can classify.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{provider} rate limit reached: {message}")]
    RateLimited { provider: String, message: String },

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an empty completion")]
    EmptyCompletion { provider: String },

    #[error("no {provider} credentials found. Run `troupe login {provider} --key <KEY>` or set {env_var}.")]
    MissingCredentials { provider: String, env_var: String },
}

impl BackendError {
    /// Build the right variant for a non-success HTTP status.
    pub fn from_status(provider: &str, status: u16, body: String) -> Self {
        if status == 429 {
            BackendError::RateLimited {
                provider: provider.to_string(),
                message: body,
            }
        } else {
            BackendError::Api {
                provider: provider.to_string(),
                status,
                body,
            }
        }
    }
}

/// The text-completion service a crew talks to. Could be an HTTP API, a
/// human at the terminal, or a test script.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short provider label for logs and banners.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<Completion>;
}
