use async_trait::async_trait;
use serde_json::Value;

/// Model provider: sends chat messages to an LLM, gets back generated text.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn chat(&self, model: &str, messages: &[Value]) -> anyhow::Result<ProviderResponse>;
}

/// Token usage statistics from an LLM API response.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
}
