//! Long-poll message relay: free-text trip requests in, chunked crew results out.
//!
//! Each inbound message walks [`RelayState`] from `Listening` through
//! `Extracting`, `Dispatching` and `Replying` back to `Listening`. A fresh crew
//! is built for every request, so no memory or results leak between chats.
//! Failures are logged in full; the chat only ever sees a fixed message and
//! the error kind name.

pub mod chunk;
pub mod extract;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::consts::RELAY_CHUNK_LIMIT;
use crate::crew::{Crew, CrewError};

pub use chunk::split_chunks;
pub use telegram::TelegramTransport;

pub const ACK_MESSAGE: &str = "🤖 Planning your trip...";
pub const HELP_MESSAGE: &str = "Tell me about your trip and I'll put a guide together.\n\n\
Example: I'm going to Lisbon from Paris for 5 days, budget 1200.\n\
En français: Je vais au Portugal, je pars de Lyon le 28 février, je reviens le 3 mars, budget moyen.";
pub const RATE_LIMIT_MESSAGE: &str =
    "⚠️ The model provider's rate limit was reached. Please try again in a few minutes.";
pub const NO_RESULT_MESSAGE: &str = "The crew finished without producing a result.";

/// A text message from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub text: String,
}

/// Where messages come from and replies go.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Wait for new messages. Each message is returned once.
    async fn poll(&self) -> Result<Vec<InboundMessage>>;

    async fn send(&self, chat_id: i64, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    #[default]
    Listening,
    Extracting,
    Dispatching,
    Replying,
}

/// Builds a fresh crew per request.
pub type CrewFactory = Box<dyn Fn() -> Result<Crew> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Other,
}

/// Rate limit if any error in the chain is [`BackendError::RateLimited`]
/// or its text mentions one.
pub fn classify(err: &anyhow::Error) -> FailureKind {
    let typed = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<BackendError>(),
            Some(BackendError::RateLimited { .. })
        )
    });
    if typed {
        return FailureKind::RateLimited;
    }

    let text = format!("{err:#}").to_lowercase();
    if text.contains("rate_limit") || text.contains("rate limit") || text.contains("429") {
        FailureKind::RateLimited
    } else {
        FailureKind::Other
    }
}

/// Short, non-leaking name for the kind of failure.
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(backend) = cause.downcast_ref::<BackendError>() {
            return match backend {
                BackendError::RateLimited { .. } => "RateLimited",
                BackendError::Api { .. } => "ApiError",
                BackendError::EmptyCompletion { .. } => "EmptyCompletion",
                BackendError::MissingCredentials { .. } => "MissingCredentials",
            };
        }
        if cause.is::<CrewError>() {
            return "CrewError";
        }
        if cause.is::<ConfigError>() {
            return "ConfigError";
        }
        if cause.is::<reqwest::Error>() {
            return "HttpError";
        }
        if cause.is::<std::io::Error>() {
            return "IoError";
        }
    }
    "Error"
}

/// What the chat sees when a request fails.
pub fn failure_message(err: &anyhow::Error) -> String {
    match classify(err) {
        FailureKind::RateLimited => RATE_LIMIT_MESSAGE.to_string(),
        FailureKind::Other => format!("⚠️ Error: {}", error_kind(err)),
    }
}

#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Maximum characters per outbound message.
    pub chunk_limit: usize,
    /// Pause after a failed poll.
    pub poll_retry: Duration,
    /// Send [`ACK_MESSAGE`] before dispatching.
    pub acknowledge: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            chunk_limit: RELAY_CHUNK_LIMIT,
            poll_retry: Duration::from_secs(5),
            acknowledge: true,
        }
    }
}

pub struct MessageRelay<T: Transport> {
    transport: T,
    factory: CrewFactory,
    options: RelayOptions,
    state: RelayState,
}

impl<T: Transport> MessageRelay<T> {
    pub fn new(transport: T, factory: CrewFactory) -> Self {
        Self {
            transport,
            factory,
            options: RelayOptions::default(),
            state: RelayState::Listening,
        }
    }

    pub fn with_options(mut self, options: RelayOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Poll forever. Poll failures are logged and retried after a pause.
    pub async fn run(&mut self) -> Result<()> {
        info!(transport = self.transport.name(), "relay listening");
        loop {
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "failed to fetch messages, retrying");
                tokio::time::sleep(self.options.poll_retry).await;
            }
        }
    }

    /// One poll plus handling of everything it returned. Returns the number
    /// of messages handled. Only a poll failure is an error here.
    pub async fn run_once(&mut self) -> Result<usize> {
        let messages = self.transport.poll().await?;
        for message in &messages {
            if let Err(e) = self.handle(message).await {
                error!(chat_id = message.chat_id, error = %e, "failed to reply");
                self.transition(RelayState::Listening);
            }
        }
        Ok(messages.len())
    }

    /// Take one message through the full cycle. Errors are transport errors;
    /// crew failures are turned into a reply.
    pub async fn handle(&mut self, message: &InboundMessage) -> Result<()> {
        let chat_id = message.chat_id;
        let text = message.text.trim();
        if text.is_empty() {
            return Ok(());
        }

        if let Some(reply) = command_reply(text) {
            self.transition(RelayState::Replying);
            self.transport.send(chat_id, reply).await?;
            self.transition(RelayState::Listening);
            return Ok(());
        }

        self.transition(RelayState::Extracting);
        let inputs = extract::build_inputs(text, Local::now().date_naive());
        info!(
            chat_id,
            destination = %inputs["destination"],
            duration = %inputs["duration"],
            budget = %inputs["budget"],
            "request received"
        );

        if self.options.acknowledge {
            self.transport.send(chat_id, ACK_MESSAGE).await?;
        }

        self.transition(RelayState::Dispatching);
        let outcome = match (self.factory)() {
            Ok(mut crew) => crew.run(&inputs).await,
            Err(e) => Err(e.context("failed to build crew")),
        };

        self.transition(RelayState::Replying);
        match outcome {
            Ok(result) => {
                let chunks = split_chunks(&result, self.options.chunk_limit);
                if chunks.is_empty() {
                    self.transport.send(chat_id, NO_RESULT_MESSAGE).await?;
                }
                for chunk in &chunks {
                    self.transport.send(chat_id, chunk).await?;
                }
                info!(chat_id, chunks = chunks.len(), "reply sent");
            }
            Err(e) => {
                error!(chat_id, kind = error_kind(&e), error = %format!("{e:#}"), "crew run failed");
                self.transport.send(chat_id, &failure_message(&e)).await?;
            }
        }

        self.transition(RelayState::Listening);
        Ok(())
    }

    fn transition(&mut self, next: RelayState) {
        debug!(from = ?self.state, to = ?next, "relay state");
        self.state = next;
    }
}

fn command_reply(text: &str) -> Option<&'static str> {
    match text.split_whitespace().next()? {
        "/start" | "/help" => Some(HELP_MESSAGE),
        _ => None,
    }
}
