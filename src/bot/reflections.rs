//! Daily reflection questions and free-text capture.

use chrono::{DateTime, Utc};
use tracing::info;

use super::Bot;
use crate::traits::{ReflectionPrompt, StateStore};
use crate::types::Reply;

/// Asked every day, in this order: (question key, question text).
pub const DAILY_QUESTIONS: &[(&str, &str)] = &[
    (
        "who_am_i",
        "Answer the question on a daily basis for 5 min: Who am I?",
    ),
    (
        "lower_expectations",
        "Need to work on lowering expectations so that I am happier.",
    ),
];

pub const SOURCE_CHAT: &str = "chat";
pub const SOURCE_REFLECTION: &str = "reflection";

const SKIP_NOTE: &str = "Skipped (low motivation)";

pub fn prompt_text(question: &str) -> String {
    format!(
        "Daily Reflection (5 min)\n\n{}\n\nReply with your answer. I will store it for future analysis.\nIf you're not motivated today, send /pass.",
        question
    )
}

fn is_skip_word(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "pass" | "skip")
}

/// Create today's prompts; returns the ones that did not exist yet.
pub async fn ensure_today(
    store: &dyn StateStore,
    chat_id: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<&'static str>> {
    let today = now.date_naive();
    let mut created = Vec::new();
    for (key, question) in DAILY_QUESTIONS {
        if store
            .ensure_reflection_prompt(chat_id, today, key, question, now)
            .await?
        {
            created.push(*question);
        }
    }
    Ok(created)
}

/// The oldest pending prompt, with a counter when more are waiting.
async fn next_pending(store: &dyn StateStore, chat_id: i64) -> anyhow::Result<Option<Reply>> {
    let Some(pending) = store.get_pending_reflection(chat_id).await? else {
        return Ok(None);
    };
    let remaining = store.count_pending_reflections(chat_id).await?;
    Ok(Some(Reply::text(pending_text(&pending, remaining))))
}

fn pending_text(pending: &ReflectionPrompt, remaining: i64) -> String {
    let mut text = prompt_text(&pending.question);
    if remaining > 1 {
        text.push_str(&format!("\n\nPending reflections: {}", remaining));
    }
    text
}

impl Bot {
    pub(super) async fn reflect(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Reply>> {
        let created = ensure_today(self.store.as_ref(), chat_id, now).await?;
        if !created.is_empty() {
            return Ok(created
                .into_iter()
                .map(|q| Reply::text(prompt_text(q)))
                .collect());
        }
        match next_pending(self.store.as_ref(), chat_id).await? {
            Some(reply) => Ok(vec![reply]),
            None => Ok(vec![Reply::text(
                "Today's reflection questions are already answered or skipped.",
            )]),
        }
    }

    pub(super) async fn pass(&self, chat_id: i64, now: DateTime<Utc>) -> anyhow::Result<Vec<Reply>> {
        let Some(skipped) = self
            .store
            .skip_pending_reflection(chat_id, SKIP_NOTE, now)
            .await?
        else {
            return Ok(vec![Reply::text("No pending reflection to skip right now.")]);
        };
        info!(chat_id, question = %skipped.question_key, "Reflection skipped");
        let mut replies = vec![Reply::text(format!("Skipped: {}", skipped.question))];
        replies.extend(next_pending(self.store.as_ref(), chat_id).await?);
        Ok(replies)
    }

    /// Text outside any flow: a reflection answer if one is pending,
    /// otherwise a journal note.
    pub(super) async fn capture_text(
        &self,
        chat_id: i64,
        text: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Reply>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        if is_skip_word(text) {
            if let Some(skipped) = self
                .store
                .skip_pending_reflection(chat_id, SKIP_NOTE, now)
                .await?
            {
                info!(chat_id, question = %skipped.question_key, "Reflection skipped");
                let mut replies = vec![Reply::text("Reflection skipped for today.")];
                replies.extend(next_pending(self.store.as_ref(), chat_id).await?);
                return Ok(replies);
            }
        }

        if let Some(answered) = self
            .store
            .answer_pending_reflection(chat_id, text.trim(), now)
            .await?
        {
            let note = format!("{} -> {}", answered.question, text.trim());
            self.store
                .add_journal_entry(chat_id, &note, SOURCE_REFLECTION, now)
                .await?;
            info!(chat_id, question = %answered.question_key, "Reflection answered");
            let mut replies = vec![Reply::text("Saved your daily reflection.")];
            replies.extend(next_pending(self.store.as_ref(), chat_id).await?);
            return Ok(replies);
        }

        self.store
            .add_journal_entry(chat_id, text, SOURCE_CHAT, now)
            .await?;
        Ok(Vec::new())
    }
}
