//! Text completion engines

use async_trait::async_trait;
use log::debug;
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion engine unavailable: {0}")]
    Unavailable(String),

    #[error("completion engine returned no text")]
    EmptyResponse,
}

/// Produces assistant text for a prompt. May fail or hang; callers bound it.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Run `engine` with an upper bound on how long it may take
pub async fn complete_within(
    engine: &dyn CompletionEngine,
    prompt: &str,
    limit: Duration,
) -> Result<String, CompletionError> {
    match tokio::time::timeout(limit, engine.complete(prompt)).await {
        Ok(Ok(text)) if text.trim().is_empty() => Err(CompletionError::EmptyResponse),
        Ok(result) => result,
        Err(_) => Err(CompletionError::Timeout(limit)),
    }
}

/// OpenAI chat completions. Reads the key from `OPENAI_KEY`.
#[derive(Debug, Clone)]
pub struct OpenAiCompletionEngine {
    model: String,
}

impl OpenAiCompletionEngine {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionEngine for OpenAiCompletionEngine {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        debug!("Requesting completion from {} ({} chars)", self.model, prompt.len());

        let completion = ChatCompletion::builder(
            &self.model,
            vec![ChatCompletionMessage {
                role: ChatCompletionMessageRole::User,
                content: Some(prompt.to_string()),
                name: None,
                function_call: None,
                tool_call_id: None,
                tool_calls: None,
            }],
        )
        .create()
        .await
        .map_err(|e| CompletionError::Unavailable(e.to_string()))?;

        completion
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or(CompletionError::EmptyResponse)
    }
}
