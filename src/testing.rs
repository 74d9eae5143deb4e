//! Test infrastructure: MockProvider, TestChannel, and TestHarness.
//!
//! Provides a real SQLite store in a temp file, a scripted model provider
//! and a channel that records everything sent through it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::bot::Bot;
use crate::coach::Coach;
use crate::providers::{ProviderError, ProviderErrorKind};
use crate::state::SqliteStateStore;
use crate::traits::{Channel, ModelProvider, ProviderResponse, TokenUsage};
use crate::types::Reply;

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

/// A recorded call to `MockProvider::chat()`.
#[derive(Debug, Clone)]
pub struct MockChatCall {
    pub model: String,
    pub messages: Vec<Value>,
}

/// Mock model provider that returns scripted responses.
pub struct MockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    fail: bool,
    pub call_log: Mutex<Vec<MockChatCall>>,
}

impl MockProvider {
    /// Create a provider that always returns "Mock response".
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create a provider with a FIFO queue of scripted responses.
    pub fn with_responses(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            fail: false,
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a server error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Helper: build a text-only ProviderResponse.
    pub fn text_response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: Some(text.to_string()),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                model: "mock".to_string(),
            }),
        }
    }

    /// How many times `chat()` was called.
    pub async fn call_count(&self) -> usize {
        self.call_log.lock().await.len()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn chat(&self, model: &str, messages: &[Value]) -> anyhow::Result<ProviderResponse> {
        self.call_log.lock().await.push(MockChatCall {
            model: model.to_string(),
            messages: messages.to_vec(),
        });

        if self.fail {
            return Err(ProviderError {
                kind: ProviderErrorKind::ServerError,
                status: Some(503),
                message: "mock outage".to_string(),
            }
            .into());
        }

        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            Ok(MockProvider::text_response("Mock response"))
        } else {
            Ok(responses.remove(0))
        }
    }
}

// ---------------------------------------------------------------------------
// TestChannel
// ---------------------------------------------------------------------------

/// Captured message sent via the channel.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: i64,
    pub reply: Reply,
}

/// A test channel that captures all outgoing messages.
pub struct TestChannel {
    pub messages: Mutex<Vec<SentMessage>>,
    /// Sends to this chat fail, to exercise per-user isolation.
    failing_chat: Option<i64>,
}

impl TestChannel {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            failing_chat: None,
        }
    }

    pub fn failing_for(chat_id: i64) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            failing_chat: Some(chat_id),
        }
    }

    /// Texts sent to one chat, in order.
    pub async fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.reply.text.clone())
            .collect()
    }

    pub async fn message_count(&self) -> usize {
        self.messages.lock().await.len()
    }
}

#[async_trait]
impl Channel for TestChannel {
    fn name(&self) -> String {
        "test".to_string()
    }

    async fn send(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()> {
        if self.failing_chat == Some(chat_id) {
            anyhow::bail!("send to chat {} failed", chat_id);
        }
        self.messages.lock().await.push(SentMessage {
            chat_id,
            reply: reply.clone(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TestHarness
// ---------------------------------------------------------------------------

/// Store, coach and bot wired together over a temp database.
pub struct TestHarness {
    pub store: Arc<SqliteStateStore>,
    pub coach: Arc<Coach>,
    pub bot: Arc<Bot>,
    pub provider: Option<Arc<MockProvider>>,
    _db_file: tempfile::NamedTempFile,
}

impl TestHarness {
    /// Rule-based coaching only.
    pub async fn new(allowed_chat_id: Option<i64>) -> Self {
        Self::build(allowed_chat_id, None).await
    }

    pub async fn with_provider(provider: MockProvider) -> Self {
        Self::build(None, Some(Arc::new(provider))).await
    }

    async fn build(allowed_chat_id: Option<i64>, provider: Option<Arc<MockProvider>>) -> Self {
        let db_file = tempfile::NamedTempFile::new().unwrap();
        let store = Arc::new(
            SqliteStateStore::new(db_file.path().to_str().unwrap())
                .await
                .unwrap(),
        );
        let model_provider = provider
            .clone()
            .map(|p| p as Arc<dyn ModelProvider>);
        let coach = Arc::new(Coach::new(store.clone(), model_provider, "mock-model", 7));
        let bot = Arc::new(Bot::new(store.clone(), coach.clone(), allowed_chat_id));
        Self {
            store,
            coach,
            bot,
            provider,
            _db_file: db_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::IncomingMessage;
    use chrono::Utc;

    #[tokio::test]
    async fn test_harness_routes_checkin_through_provider() {
        let h = TestHarness::with_provider(MockProvider::with_responses(vec![
            MockProvider::text_response("Focus on the invoice."),
        ]))
        .await;
        let replies = h
            .bot
            .handle_message(&IncomingMessage::new(9, "/checkin"), Utc::now())
            .await;
        assert_eq!(replies[0].text, "Focus on the invoice.");

        let provider = h.provider.as_ref().unwrap();
        assert_eq!(provider.call_count().await, 1);
        assert_eq!(provider.call_log.lock().await[0].model, "mock-model");
    }
}
