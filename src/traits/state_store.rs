use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// User profiles, one per chat.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create the profile on first contact or refresh its names; the main
    /// goal and creation time are only set on insert.
    async fn upsert_user(
        &self,
        chat_id: i64,
        username: &str,
        first_name: &str,
    ) -> anyhow::Result<super::UserProfile>;

    async fn get_user_profile(&self, chat_id: i64) -> anyhow::Result<Option<super::UserProfile>>;

    /// Every chat that has ever talked to the bot.
    async fn list_chat_ids(&self) -> anyhow::Result<Vec<i64>>;

    async fn set_main_goal(&self, chat_id: i64, main_goal: &str) -> anyhow::Result<()>;
}

/// To-do items.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert an active task. A missing deadline becomes one month after `now`.
    async fn add_task(
        &self,
        chat_id: i64,
        task: &super::NewTask,
        now: DateTime<Utc>,
    ) -> anyhow::Result<super::Task>;

    /// Active tasks ordered by priority, deadline, then age.
    async fn list_active_tasks(&self, chat_id: i64, limit: usize)
        -> anyhow::Result<Vec<super::Task>>;

    /// Active tasks created at least `stale_days` ago.
    async fn get_stale_tasks(
        &self,
        chat_id: i64,
        stale_days: i64,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<super::Task>>;

    /// Active tasks whose deadline already passed.
    async fn get_overdue_tasks(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<super::Task>>;

    /// Tasks completed within the last `days` days, newest first.
    async fn get_recent_completed_tasks(
        &self,
        chat_id: i64,
        days: i64,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<super::Task>>;

    /// Returns false when the task is missing, owned by another chat, or already done.
    async fn mark_task_done(
        &self,
        chat_id: i64,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    async fn delete_task(&self, chat_id: i64, task_id: &str) -> anyhow::Result<bool>;

    /// Record that a check-in flagged these tasks as stale.
    async fn mark_tasks_nudged(
        &self,
        chat_id: i64,
        task_ids: &[String],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn get_task_stats(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<super::TaskStats>;
}

/// Journal notes.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Returns `None` when the text is blank after whitespace collapsing.
    async fn add_journal_entry(
        &self,
        chat_id: i64,
        text: &str,
        source: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<super::JournalEntry>>;

    /// Newest first.
    async fn get_recent_journal_entries(
        &self,
        chat_id: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<String>>;
}

/// Daily reflection prompts and answers.
#[async_trait]
pub trait ReflectionStore: Send + Sync {
    /// Create today's prompt for `question_key` unless it already exists.
    /// Returns true when a new prompt was created.
    async fn ensure_reflection_prompt(
        &self,
        chat_id: i64,
        prompt_date: NaiveDate,
        question_key: &str,
        question: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// Oldest prompt still waiting for an answer.
    async fn get_pending_reflection(
        &self,
        chat_id: i64,
    ) -> anyhow::Result<Option<super::ReflectionPrompt>>;

    async fn count_pending_reflections(&self, chat_id: i64) -> anyhow::Result<i64>;

    /// Store `answer` on the oldest pending prompt; `None` if nothing was pending.
    async fn answer_pending_reflection(
        &self,
        chat_id: i64,
        answer: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<super::ReflectionPrompt>>;

    /// Mark the oldest pending prompt as skipped; `None` if nothing was pending.
    async fn skip_pending_reflection(
        &self,
        chat_id: i64,
        note: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<super::ReflectionPrompt>>;

    /// Recent answered prompts rendered as `question -> answer`, newest first.
    async fn get_recent_reflection_answers(
        &self,
        chat_id: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<String>>;
}

/// Recurring chore state.
#[async_trait]
pub trait ChoreStore: Send + Sync {
    /// Seed the default chores, first due on the coming preferred weekday.
    /// Existing rows are left untouched.
    async fn ensure_default_chores(&self, chat_id: i64, now: DateTime<Utc>) -> anyhow::Result<()>;

    /// All chores ordered by next due date.
    async fn list_chores(&self, chat_id: i64) -> anyhow::Result<Vec<super::Chore>>;

    /// Chores due on or before `day`.
    async fn list_due_chores(
        &self,
        chat_id: i64,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<super::Chore>>;

    async fn get_chore(&self, chat_id: i64, chore_id: &str)
        -> anyhow::Result<Option<super::Chore>>;

    /// Persist the mutable fields of a chore (due date, completion, flags).
    async fn update_chore(&self, chore: &super::Chore) -> anyhow::Result<()>;

    async fn mark_chore_prompted(
        &self,
        chat_id: i64,
        chore_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Everything the bot persists.
pub trait StateStore: UserStore + TaskStore + JournalStore + ReflectionStore + ChoreStore {}

impl<T> StateStore for T where T: UserStore + TaskStore + JournalStore + ReflectionStore + ChoreStore
{}
