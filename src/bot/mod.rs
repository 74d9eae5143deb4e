//! Chat-facing behaviour, independent of the transport.
//!
//! The Telegram adapter turns updates into [`IncomingMessage`] and callback
//! data, calls into [`Bot`], and renders whatever comes back.

mod callbacks;
mod commands;
pub mod reflections;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::coach::Coach;
use crate::flow::{FlowRegistry, FlowStep};
use crate::traits::StateStore;
use crate::types::Reply;

pub use callbacks::CallbackOutcome;

pub const UNAUTHORIZED_TEXT: &str = "Unauthorized chat.";
pub const GENERIC_FAILURE_TEXT: &str = "Something went wrong while saving that. Please try again.";

/// Commands registered with Telegram at startup, in menu order.
pub const BOT_COMMANDS: &[(&str, &str)] = &[
    ("start", "Start the coach"),
    ("help", "Show available commands"),
    ("add", "Add a task"),
    ("list", "List active tasks"),
    ("goal", "Show or set your main goal"),
    ("checkin", "Get a coaching check-in now"),
    ("review", "Get a weekly review now"),
    ("improve", "Analyze how you execute"),
    ("reflect", "Answer today's reflection"),
    ("pass", "Skip the pending reflection"),
    ("chores", "Show weekend chores"),
    ("cancel", "Cancel the add flow"),
];

pub const HELP_TEXT: &str = "Commands:\n\
/start - start the coach\n\
/help - show this message\n\
/add - interactive task creation\n\
/add <task> | <priority> | <deadline> - quick add\n\
/list - show active tasks with Done/Delete buttons\n\
/goal - show your main goal\n\
/goal <text> - set your main goal\n\
/checkin - coaching check-in now\n\
/review - weekly review now\n\
/improve - analysis of how you execute\n\
/reflect - answer today's reflection questions\n\
/pass - skip the pending reflection\n\
/chores - weekend chores and schedule\n\
/cancel - cancel the add flow\n\n\
Priority: high / medium / low (or p1 / p2 / p3, 1 / 2 / 3)\n\
Deadline: YYYY-MM-DD, or skip for the default (+1 month)\n\n\
Tip: any other message is saved as a journal note for future coaching.";

/// One inbound chat message, already stripped of transport details.
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub username: String,
    pub first_name: String,
    pub text: String,
}

#[cfg(test)]
impl IncomingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Split `/cmd@botname args` into (`cmd`, `args`). `None` for plain text.
pub fn parse_command(text: &str) -> Option<(String, &str)> {
    let text = text.trim_start();
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or("").to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, args))
}

pub struct Bot {
    store: Arc<dyn StateStore>,
    coach: Arc<Coach>,
    flows: FlowRegistry,
    allowed_chat_id: Option<i64>,
}

impl Bot {
    pub fn new(store: Arc<dyn StateStore>, coach: Arc<Coach>, allowed_chat_id: Option<i64>) -> Self {
        Self {
            store,
            coach,
            flows: FlowRegistry::new(),
            allowed_chat_id,
        }
    }

    pub fn is_authorized(&self, chat_id: i64) -> bool {
        match self.allowed_chat_id {
            Some(allowed) => allowed == chat_id,
            None => true,
        }
    }

    #[cfg(test)]
    pub fn flows(&self) -> &FlowRegistry {
        &self.flows
    }

    /// Handle one message and return the replies to send, in order.
    pub async fn handle_message(&self, msg: &IncomingMessage, now: DateTime<Utc>) -> Vec<Reply> {
        if !self.is_authorized(msg.chat_id) {
            warn!(chat_id = msg.chat_id, "Message from unauthorized chat");
            return vec![Reply::text(UNAUTHORIZED_TEXT)];
        }

        let result = match parse_command(&msg.text) {
            Some((name, args)) => self.handle_command(msg, &name, args, now).await,
            None => self.handle_text(msg.chat_id, &msg.text, now).await,
        };

        match result {
            Ok(replies) => replies,
            Err(e) => {
                error!(chat_id = msg.chat_id, error = %e, "Failed to handle message");
                vec![Reply::text(GENERIC_FAILURE_TEXT)]
            }
        }
    }

    /// Non-command text: feeds the `/add` flow, else answers a pending
    /// reflection, else becomes a journal note.
    async fn handle_text(
        &self,
        chat_id: i64,
        text: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Reply>> {
        if self.flows.is_active(chat_id).await {
            let before = self.flows.state(chat_id).await;
            return match self.flows.handle_input(chat_id, text).await {
                FlowStep::Continue(reply) | FlowStep::Retry(reply) => Ok(vec![reply]),
                FlowStep::Complete(task) => match self.store.add_task(chat_id, &task, now).await {
                    Ok(saved) => Ok(vec![Reply::text(commands::added_line(&saved))]),
                    Err(e) => {
                        self.flows.restore(chat_id, before).await;
                        Err(e)
                    }
                },
                FlowStep::NotActive => self.capture_text(chat_id, text, now).await,
            };
        }
        self.capture_text(chat_id, text, now).await
    }
}
