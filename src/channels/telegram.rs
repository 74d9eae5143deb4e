use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{
    BotCommand, ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, MaybeInaccessibleMessage,
};
use tracing::{info, warn};

use super::formatting::{split_message, TELEGRAM_MAX_LEN};
use crate::bot::{parse_command, Bot as ChatHandler, IncomingMessage, BOT_COMMANDS};
use crate::traits::Channel;
use crate::types::{Button, Reply};

/// Commands that call the model and may take a few seconds.
const SLOW_COMMANDS: &[&str] = &["checkin", "review", "improve"];

pub struct TelegramChannel {
    bot: Bot,
    handler: Arc<ChatHandler>,
}

fn keyboard_markup(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}

impl TelegramChannel {
    pub fn new(bot_token: &str, handler: Arc<ChatHandler>) -> Self {
        Self {
            bot: Bot::new(bot_token),
            handler,
        }
    }

    /// Publish the command menu (`setMyCommands`).
    pub async fn register_commands(&self) -> anyhow::Result<()> {
        let commands: Vec<BotCommand> = BOT_COMMANDS
            .iter()
            .map(|(name, description)| BotCommand::new(*name, *description))
            .collect();
        self.bot.set_my_commands(commands).await?;
        info!(count = BOT_COMMANDS.len(), "Registered Telegram commands");
        Ok(())
    }

    /// Start the Telegram dispatcher with automatic retry on crash.
    /// Uses exponential backoff: 5s, 10s, 20s, 40s, then 60s cap.
    /// Resets backoff to initial after a stable run (60s+).
    pub async fn start_with_retry(self: Arc<Self>) {
        let initial_backoff = Duration::from_secs(5);
        let max_backoff = Duration::from_secs(60);
        let stable_threshold = Duration::from_secs(60);
        let mut backoff = initial_backoff;

        loop {
            info!("Starting Telegram dispatcher");
            let started = tokio::time::Instant::now();
            self.clone().start().await;
            let ran_for = started.elapsed();

            if ran_for >= stable_threshold {
                backoff = initial_backoff;
            }

            warn!(
                backoff_secs = backoff.as_secs(),
                ran_for_secs = ran_for.as_secs(),
                "Telegram dispatcher stopped, restarting"
            );
            tokio::time::sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, max_backoff);
        }
    }

    pub async fn start(self: Arc<Self>) {
        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint({
                let channel = Arc::clone(&self);
                move |msg: Message| {
                    let channel = Arc::clone(&channel);
                    async move {
                        channel.handle_message(msg).await;
                        respond(())
                    }
                }
            }))
            .branch(Update::filter_callback_query().endpoint({
                let channel = Arc::clone(&self);
                move |q: CallbackQuery| {
                    let channel = Arc::clone(&channel);
                    async move {
                        channel.handle_callback(q).await;
                        respond(())
                    }
                }
            }));

        Dispatcher::builder(self.bot.clone(), handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_message(&self, msg: Message) {
        let Some(text) = msg.text() else {
            return;
        };
        let chat_id = msg.chat.id.0;
        let (username, first_name) = msg
            .from
            .as_ref()
            .map(|u| (u.username.clone().unwrap_or_default(), u.first_name.clone()))
            .unwrap_or_default();

        if let Some((name, _)) = parse_command(text) {
            if SLOW_COMMANDS.contains(&name.as_str()) {
                let _ = self
                    .bot
                    .send_chat_action(msg.chat.id, ChatAction::Typing)
                    .await;
            }
        }

        let incoming = IncomingMessage {
            chat_id,
            username,
            first_name,
            text: text.to_string(),
        };
        let replies = self.handler.handle_message(&incoming, Utc::now()).await;
        for reply in &replies {
            if let Err(e) = self.send(chat_id, reply).await {
                warn!(chat_id, error = %e, "Failed to send reply");
            }
        }
    }

    /// Handle callback query from inline keyboard buttons.
    async fn handle_callback(&self, q: CallbackQuery) {
        let Some(data) = q.data.clone() else {
            return;
        };
        let message = match &q.message {
            Some(MaybeInaccessibleMessage::Regular(m)) => Some(m),
            _ => None,
        };
        let chat_id = message
            .map(|m| m.chat.id.0)
            .unwrap_or(q.from.id.0 as i64);
        let original = message.and_then(|m| m.text()).unwrap_or("");

        let outcome = self
            .handler
            .handle_callback(chat_id, &data, original, Utc::now())
            .await;

        let mut answer = self.bot.answer_callback_query(q.id.clone());
        if let Some(notice) = &outcome.notice {
            answer = answer.text(notice.clone()).show_alert(outcome.alert);
        }
        if let Err(e) = answer.await {
            warn!(chat_id, error = %e, "Failed to answer callback");
        }

        if let (Some(m), Some(text)) = (message, outcome.edited_text) {
            if let Err(e) = self.bot.edit_message_text(m.chat.id, m.id, text).await {
                warn!(chat_id, error = %e, "Failed to edit message");
            }
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> String {
        "telegram".to_string()
    }

    /// Long texts go out in several messages; the keyboard rides on the last.
    async fn send(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()> {
        let chunks = split_message(&reply.text, TELEGRAM_MAX_LEN);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let request = self.bot.send_message(ChatId(chat_id), chunk);
            if i == last && !reply.keyboard.is_empty() {
                request.reply_markup(keyboard_markup(&reply.keyboard)).await?;
            } else {
                request.await?;
            }
        }
        Ok(())
    }
}
