//! Coaching messages: model-written when a provider is configured, rule-based otherwise.

mod learning;
mod prompts;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use crate::providers::ProviderError;
use crate::traits::{ModelProvider, StateStore, DEFAULT_MAIN_GOAL};

pub use learning::{build_learning_profile, LearningProfile, ProfileInput};
pub use prompts::{normalize_output, CoachContext};

/// How much history each kind of run pulls from the store.
#[derive(Debug, Clone, Copy)]
struct HistoryLimits {
    active: usize,
    completed_days: i64,
    completed: usize,
    /// `None` uses the configured staleness threshold.
    stale_days: Option<i64>,
    stale: usize,
    overdue: usize,
    notes: usize,
    reflections: usize,
}

const CHECKIN_LIMITS: HistoryLimits = HistoryLimits {
    active: 30,
    completed_days: 120,
    completed: 300,
    stale_days: None,
    stale: 10,
    overdue: 10,
    notes: 10,
    reflections: 8,
};

const IMPROVEMENT_LIMITS: HistoryLimits = HistoryLimits {
    active: 40,
    completed_days: 180,
    completed: 400,
    stale_days: Some(7),
    stale: 20,
    overdue: 20,
    notes: 20,
    reflections: 12,
};

pub struct Coach {
    store: Arc<dyn StateStore>,
    provider: Option<Arc<dyn ModelProvider>>,
    model: String,
    stale_days: i64,
}

impl Coach {
    pub fn new(
        store: Arc<dyn StateStore>,
        provider: Option<Arc<dyn ModelProvider>>,
        model: impl Into<String>,
        stale_days: i64,
    ) -> Self {
        Self {
            store,
            provider,
            model: model.into(),
            stale_days,
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Daily check-in body. Stale tasks it mentions are marked as nudged.
    pub async fn checkin(&self, chat_id: i64, now: DateTime<Utc>) -> anyhow::Result<String> {
        self.coaching(chat_id, now, false).await
    }

    /// Same sections as the check-in, framed as a weekly review.
    pub async fn weekly_review(&self, chat_id: i64, now: DateTime<Utc>) -> anyhow::Result<String> {
        self.coaching(chat_id, now, true).await
    }

    /// Longer diagnosis of how the user executes (`/improve`).
    pub async fn improvement(&self, chat_id: i64, now: DateTime<Utc>) -> anyhow::Result<String> {
        let ctx = self.load_context(chat_id, now, IMPROVEMENT_LIMITS).await?;
        let prompt = prompts::build_improvement_prompt(&ctx);
        let text = match self.generate(chat_id, &prompt).await {
            Some(text) => text,
            None => prompts::fallback_improvement_message(&ctx),
        };
        Ok(normalize_output(&text))
    }

    async fn coaching(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
        weekly: bool,
    ) -> anyhow::Result<String> {
        let ctx = self.load_context(chat_id, now, CHECKIN_LIMITS).await?;
        let prompt = prompts::build_checkin_prompt(&ctx, weekly);
        let text = match self.generate(chat_id, &prompt).await {
            Some(text) => text,
            None => prompts::fallback_coaching_message(&ctx),
        };

        let stale_ids: Vec<String> = ctx.stale.iter().map(|t| t.id.clone()).collect();
        if let Err(e) = self.store.mark_tasks_nudged(chat_id, &stale_ids, now).await {
            warn!(chat_id, error = %e, "Failed to mark stale tasks as nudged");
        }

        Ok(normalize_output(&text))
    }

    async fn load_context(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
        limits: HistoryLimits,
    ) -> anyhow::Result<CoachContext> {
        let main_goal = self
            .store
            .get_user_profile(chat_id)
            .await?
            .map(|p| p.main_goal)
            .unwrap_or_else(|| DEFAULT_MAIN_GOAL.to_string());
        let stale_days = limits.stale_days.unwrap_or(self.stale_days);

        let active = self.store.list_active_tasks(chat_id, limits.active).await?;
        let completed = self
            .store
            .get_recent_completed_tasks(chat_id, limits.completed_days, now, limits.completed)
            .await?;
        let stale = self
            .store
            .get_stale_tasks(chat_id, stale_days, now, limits.stale)
            .await?;
        let overdue = self
            .store
            .get_overdue_tasks(chat_id, now, limits.overdue)
            .await?;
        let stats = self.store.get_task_stats(chat_id, now).await?;
        let notes = self
            .store
            .get_recent_journal_entries(chat_id, limits.notes)
            .await?;
        let reflections = self
            .store
            .get_recent_reflection_answers(chat_id, limits.reflections)
            .await?;

        let profile = build_learning_profile(&ProfileInput {
            active: &active,
            completed: &completed,
            stale: &stale,
            overdue: &overdue,
            notes: &notes,
            reflections: &reflections,
            now,
        });

        Ok(CoachContext {
            main_goal,
            active,
            completed,
            stale,
            overdue,
            stats,
            notes,
            reflections,
            profile,
            stale_days,
            now,
        })
    }

    /// Model text, or `None` when the provider is absent, fails, or says nothing.
    async fn generate(&self, chat_id: i64, prompt: &str) -> Option<String> {
        let provider = self.provider.as_ref()?;
        let messages = vec![
            json!({"role": "system", "content": prompts::COACH_SYSTEM_PROMPT}),
            json!({"role": "user", "content": prompt}),
        ];
        match provider.chat(&self.model, &messages).await {
            Ok(resp) => {
                if let Some(usage) = &resp.usage {
                    info!(
                        chat_id,
                        model = %usage.model,
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "Coaching generated"
                    );
                }
                // Markdown-only replies normalize to nothing; let the rules answer.
                resp.content
                    .map(|c| normalize_output(&c))
                    .filter(|c| !c.is_empty())
            }
            Err(e) => {
                let kind = e
                    .downcast_ref::<ProviderError>()
                    .map(|pe| pe.label())
                    .unwrap_or("unknown");
                warn!(chat_id, kind, error = %e, "Model call failed; using rule-based coaching");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SqliteStateStore;
    use crate::testing::MockProvider;
    use crate::traits::{NewTask, TaskStore, UserStore};
    use crate::types::Priority;
    use chrono::{Duration, TimeZone};

    async fn setup() -> (Arc<SqliteStateStore>, tempfile::NamedTempFile) {
        let db_file = tempfile::NamedTempFile::new().unwrap();
        let store = SqliteStateStore::new(db_file.path().to_str().unwrap())
            .await
            .unwrap();
        (Arc::new(store), db_file)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 20, 16, 0, 0).unwrap()
    }

    async fn seed_stale_task(store: &SqliteStateStore) -> String {
        store.upsert_user(1, "u", "U").await.unwrap();
        store
            .add_task(
                1,
                &NewTask {
                    title: "Update pricing page".to_string(),
                    priority: Priority::High,
                    deadline: None,
                },
                now() - Duration::days(10),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_without_provider_uses_fallback_and_nudges_stale() {
        let (store, _f) = setup().await;
        let id = seed_stale_task(&store).await;
        let coach = Coach::new(store.clone(), None, "gpt-4o-mini", 7);
        assert!(!coach.ai_enabled());

        let text = coach.checkin(1, now()).await.unwrap();
        assert!(text.starts_with("1) Today Focus"));
        assert!(text.contains("Update pricing page (10 days old)"));

        let stale = store.get_stale_tasks(1, 7, now(), 10).await.unwrap();
        assert_eq!(stale[0].id, id);
        assert_eq!(stale[0].last_nudged_at, Some(now()));
    }

    #[tokio::test]
    async fn test_failing_provider_falls_back_to_rules() {
        let (store, _f) = setup().await;
        seed_stale_task(&store).await;
        let provider = Arc::new(MockProvider::failing());
        let coach = Coach::new(store.clone(), Some(provider.clone()), "m", 7);

        for text in [
            coach.checkin(1, now()).await.unwrap(),
            coach.weekly_review(1, now()).await.unwrap(),
            coach.improvement(1, now()).await.unwrap(),
        ] {
            assert!(!text.trim().is_empty());
        }
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_model_output_is_normalized() {
        let (store, _f) = setup().await;
        seed_stale_task(&store).await;
        let provider = Arc::new(MockProvider::with_responses(vec![
            MockProvider::text_response("## 1. Today Focus\n* **Ship** pricing"),
        ]));
        let coach = Coach::new(store.clone(), Some(provider.clone()), "m", 7);

        let text = coach.checkin(1, now()).await.unwrap();
        assert_eq!(text, "1) Today Focus\n- Ship pricing");

        let calls = provider.call_log.lock().await;
        let user_prompt = calls[0].messages[1]["content"].as_str().unwrap();
        assert!(user_prompt.contains("Main goal: make money"));
        assert!(user_prompt.contains("Update pricing page"));
    }

    #[tokio::test]
    async fn test_empty_model_reply_falls_back() {
        let (store, _f) = setup().await;
        store.upsert_user(1, "u", "U").await.unwrap();
        let provider = Arc::new(MockProvider::with_responses(vec![
            MockProvider::text_response("   "),
        ]));
        let coach = Coach::new(store.clone(), Some(provider), "m", 7);
        let text = coach.improvement(1, now()).await.unwrap();
        assert!(text.contains("1) How You Get Things Done"));
    }

    #[tokio::test]
    async fn test_markdown_only_reply_falls_back() {
        let (store, _f) = setup().await;
        seed_stale_task(&store).await;
        let provider = Arc::new(MockProvider::with_responses(vec![
            MockProvider::text_response("```\n```"),
            MockProvider::text_response("**"),
        ]));
        let coach = Coach::new(store.clone(), Some(provider.clone()), "m", 7);

        let checkin = coach.checkin(1, now()).await.unwrap();
        assert!(checkin.starts_with("1) Today Focus"));
        let improvement = coach.improvement(1, now()).await.unwrap();
        assert!(improvement.contains("1) How You Get Things Done"));
        assert_eq!(provider.call_count().await, 2);
    }
}
