use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChoreKind, Priority, ReflectionStatus, TaskStatus};

mod channels;
mod provider;
mod state_store;

pub use channels::Channel;
pub use provider::{ModelProvider, ProviderResponse, TokenUsage};
pub use state_store::*;

/// One profile per chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub chat_id: i64,
    pub username: String,
    pub first_name: String,
    pub main_goal: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_MAIN_GOAL: &str = "make money";

/// A to-do item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub chat_id: i64,
    pub title: String,
    pub priority: Priority,
    pub project_type: String,
    pub deadline: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Last time a check-in flagged this task as stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_nudged_at: Option<DateTime<Utc>>,
}

/// Fields needed to create a task; the store fills ids, timestamps and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
}

/// Rolling counters used in coaching prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub active: i64,
    pub done_7d: i64,
    pub done_30d: i64,
    pub created_7d: i64,
    pub created_30d: i64,
}

/// A free-text note captured from chat or from a reflection answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub chat_id: i64,
    pub text: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// A daily reflection question and, once handled, its answer or skip note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionPrompt {
    pub id: String,
    pub chat_id: i64,
    pub prompt_date: NaiveDate,
    pub question_key: String,
    pub question: String,
    pub status: ReflectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub asked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

/// Recurring household chore state for one chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chore {
    pub id: String,
    pub chat_id: i64,
    pub kind: ChoreKind,
    pub interval_days: i64,
    /// `chrono::Weekday::num_days_from_monday` of the day the chore lands on.
    pub preferred_weekday: u32,
    pub next_due_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_prompted_at: Option<DateTime<Utc>>,
    pub passed_for_weekend: bool,
    pub updated_at: DateTime<Utc>,
}
