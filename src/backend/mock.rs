use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Backend, BackendError, Completion};

/// One scripted reaction to a prompt.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    RateLimited,
}

/// A scripted backend for tests. Returns pre-defined replies in order and
/// records every prompt it receives.
pub struct ScriptedBackend {
    replies: Vec<Reply>,
    index: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            index: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: every reply is a successful text.
    pub fn texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(texts.into_iter().map(|t| Reply::Text(t.into())).collect())
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.get(i).ok_or_else(|| {
            anyhow::anyhow!("ScriptedBackend: no more replies (called {} times)", i + 1)
        })?;
        match reply {
            Reply::Text(text) => Ok(Completion::text(text.clone())),
            Reply::Fail(message) => Err(anyhow::anyhow!("{message}")),
            Reply::RateLimited => Err(BackendError::RateLimited {
                provider: "scripted".to_string(),
                message: "429 Too Many Requests".to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_and_records_prompts() {
        let backend = ScriptedBackend::texts(["one", "two"]);
        assert_eq!(backend.generate("p1").await.unwrap().text, "one");
        assert_eq!(backend.generate("p2").await.unwrap().text, "two");
        assert_eq!(backend.prompts(), vec!["p1".to_string(), "p2".to_string()]);
    }

    #[tokio::test]
    async fn exhausted_script_is_an_error() {
        let backend = ScriptedBackend::texts(Vec::<String>::new());
        let err = backend.generate("p").await.unwrap_err();
        assert!(err.to_string().contains("no more replies"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn rate_limited_reply_is_typed() {
        let backend = ScriptedBackend::new(vec![Reply::RateLimited]);
        let err = backend.generate("p").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BackendError>(),
            Some(BackendError::RateLimited { .. })
        ));
    }
}
