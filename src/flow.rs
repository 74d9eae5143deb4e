//! Interactive `/add` dialog: one pending flow per chat.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::parsing::{parse_deadline, parse_priority};
use crate::traits::NewTask;
use crate::types::{Button, Priority, Reply};

pub const CALLBACK_CANCEL: &str = "add:cancel";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AddFlowState {
    #[default]
    Idle,
    AwaitingTaskText,
    AwaitingPriority {
        title: String,
    },
    AwaitingDeadline {
        title: String,
        priority: Priority,
    },
}

/// Outcome of feeding one message into the flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStep {
    /// Moved to the next state; ask the next question.
    Continue(Reply),
    /// Input rejected, state unchanged.
    Retry(Reply),
    /// All fields collected; the chat is idle again.
    Complete(NewTask),
    /// No flow in progress; the message belongs to someone else.
    NotActive,
}

fn cancel_keyboard() -> Vec<Vec<Button>> {
    vec![vec![Button::new("Cancel", CALLBACK_CANCEL)]]
}

fn ask(text: &str) -> Reply {
    Reply::with_keyboard(text, cancel_keyboard())
}

impl AddFlowState {
    pub fn is_active(&self) -> bool {
        !matches!(self, AddFlowState::Idle)
    }

    /// Pure transition; returns the next state and what to tell the user.
    pub fn advance(&self, input: &str) -> (AddFlowState, FlowStep) {
        let input = input.trim();
        match self {
            AddFlowState::Idle => (AddFlowState::Idle, FlowStep::NotActive),
            AddFlowState::AwaitingTaskText => {
                if input.is_empty() {
                    return (
                        self.clone(),
                        FlowStep::Retry(ask("Title cannot be empty. Send task title.")),
                    );
                }
                (
                    AddFlowState::AwaitingPriority {
                        title: input.to_string(),
                    },
                    FlowStep::Continue(ask("Send priority: high/medium/low (or 1/2/3).")),
                )
            }
            AddFlowState::AwaitingPriority { title } => match parse_priority(input) {
                Some(priority) => (
                    AddFlowState::AwaitingDeadline {
                        title: title.clone(),
                        priority,
                    },
                    FlowStep::Continue(ask(
                        "Send deadline in YYYY-MM-DD, or `skip` for default (+1 month).",
                    )),
                ),
                None => (
                    self.clone(),
                    FlowStep::Retry(ask("Invalid priority. Use high/medium/low or 1/2/3.")),
                ),
            },
            AddFlowState::AwaitingDeadline { title, priority } => match parse_deadline(input) {
                Ok(deadline) => (
                    AddFlowState::Idle,
                    FlowStep::Complete(NewTask {
                        title: title.clone(),
                        priority: *priority,
                        deadline,
                    }),
                ),
                Err(message) => (self.clone(), FlowStep::Retry(ask(&message))),
            },
        }
    }
}

/// Pending `/add` flows keyed by chat.
#[derive(Default)]
pub struct FlowRegistry {
    flows: Mutex<HashMap<i64, AddFlowState>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start the dialog, dropping any half-filled draft.
    pub async fn start(&self, chat_id: i64) -> Reply {
        self.flows
            .lock()
            .await
            .insert(chat_id, AddFlowState::AwaitingTaskText);
        ask("Send task title.")
    }

    /// Returns true if a flow was in progress.
    pub async fn cancel(&self, chat_id: i64) -> bool {
        self.flows
            .lock()
            .await
            .remove(&chat_id)
            .is_some_and(|state| state.is_active())
    }

    pub async fn state(&self, chat_id: i64) -> AddFlowState {
        self.flows
            .lock()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn is_active(&self, chat_id: i64) -> bool {
        self.state(chat_id).await.is_active()
    }

    /// Put a chat back into `state`, e.g. after the final save failed.
    pub async fn restore(&self, chat_id: i64, state: AddFlowState) {
        let mut flows = self.flows.lock().await;
        if state.is_active() {
            flows.insert(chat_id, state);
        } else {
            flows.remove(&chat_id);
        }
    }

    /// Feed a message into the chat's flow and store the resulting state.
    pub async fn handle_input(&self, chat_id: i64, input: &str) -> FlowStep {
        let mut flows = self.flows.lock().await;
        let current = flows.get(&chat_id).cloned().unwrap_or_default();
        let (next, step) = current.advance(input);
        if next.is_active() {
            flows.insert(chat_id, next);
        } else {
            flows.remove(&chat_id);
        }
        step
    }
}
