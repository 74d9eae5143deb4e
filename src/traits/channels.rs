use async_trait::async_trait;

use crate::types::Reply;

/// Outbound side of the chat transport.
///
/// Scheduled jobs only need to push messages into a chat, so they talk to
/// this trait instead of the Telegram client directly.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Unique name for this channel (e.g., "telegram").
    fn name(&self) -> String;

    /// Send one message, with its inline keyboard if it has one.
    async fn send(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()>;

    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.send(chat_id, &Reply::text(text)).await
    }
}
