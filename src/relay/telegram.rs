//! Telegram Bot API transport: `getUpdates` long-polling and `sendMessage`.

use anyhow::{Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use super::chunk::split_utf16;
use super::{InboundMessage, Transport};

const API_BASE: &str = "https://api.telegram.org";
/// Seconds Telegram holds a `getUpdates` request open.
const LONG_POLL_SECS: u64 = 30;
/// `sendMessage` rejects text longer than this many UTF-16 code units.
const MESSAGE_LIMIT_UTF16: usize = 4096;

#[derive(Deserialize, Debug)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Deserialize, Debug)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Chat {
    id: i64,
}

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

pub struct TelegramTransport {
    token: String,
    base_url: String,
    client: Client,
    /// Next `update_id` to ask for; everything below it is acknowledged.
    offset: AtomicI64,
}

impl std::fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("base_url", &self.base_url)
            .field("offset", &self.offset.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TelegramTransport {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: API_BASE.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(LONG_POLL_SECS * 2))
                .build()
                .unwrap_or_default(),
            offset: AtomicI64::new(0),
        }
    }

    /// Point at a different API host (local Bot API server, test stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn poll(&self) -> Result<Vec<InboundMessage>> {
        let offset = self.offset.load(Ordering::SeqCst);
        let response = self
            .client
            .get(format!(
                "{}?offset={offset}&timeout={LONG_POLL_SECS}",
                self.method_url("getUpdates")
            ))
            .send()
            .await?
            .json::<ApiResponse<Vec<Update>>>()
            .await?;

        if !response.ok {
            bail!(
                "Telegram getUpdates failed: {}",
                response.description.unwrap_or_else(|| "ok=false".to_string())
            );
        }

        let updates = response.result.unwrap_or_default();
        Ok(collect_messages(updates, &self.offset))
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        // A chunk within the character limit can still exceed the UTF-16 one.
        for piece in split_utf16(text, MESSAGE_LIMIT_UTF16) {
            let response = self
                .client
                .post(self.method_url("sendMessage"))
                .json(&SendMessage {
                    chat_id,
                    text: &piece,
                })
                .send()
                .await?
                .json::<ApiResponse<serde_json::Value>>()
                .await?;

            if !response.ok {
                bail!(
                    "Telegram sendMessage failed: {}",
                    response.description.unwrap_or_else(|| "ok=false".to_string())
                );
            }
        }
        Ok(())
    }
}

/// Advance `offset` past every update and keep the ones carrying text.
fn collect_messages(updates: Vec<Update>, offset: &AtomicI64) -> Vec<InboundMessage> {
    let mut messages = Vec::new();
    for update in updates {
        offset.fetch_max(update.update_id + 1, Ordering::SeqCst);
        if let Some(Message {
            chat,
            text: Some(text),
        }) = update.message
        {
            messages.push(InboundMessage {
                chat_id: chat.id,
                text,
            });
        }
    }
    messages
}
