//! Time-based jobs: daily check-in, reflection, weekend chore prompts and
//! the weekly review. Every schedule is a 5-field cron expression in UTC.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc, Weekday};
use croner::Cron;
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::bot::reflections;
use crate::chores::{confirmation_prompt, is_weekend};
use crate::coach::Coach;
use crate::config::AppConfig;
use crate::traits::{Channel, StateStore};
use crate::types::Reply;

pub const CHORES_MORNING_HEADER: &str =
    "Weekend chore reminder (morning)\n\nPlease answer each chore one by one.";
pub const CHORES_CONFIRM_HEADER: &str = "End-of-day chore confirmation\n\nPlease confirm each chore.\nAnything not done stays in weekend reminders.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Checkin,
    Reflection,
    ChoresMorning,
    ChoresConfirm,
    WeeklyReview,
}

impl JobKind {
    pub fn name(self) -> &'static str {
        match self {
            JobKind::Checkin => "daily_checkin",
            JobKind::Reflection => "daily_reflection",
            JobKind::ChoresMorning => "chores_morning",
            JobKind::ChoresConfirm => "chores_confirm",
            JobKind::WeeklyReview => "weekly_review",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub kind: JobKind,
    pub cron_expr: String,
    pub next_run: DateTime<Utc>,
}

pub fn daily_cron(hour: u32) -> String {
    format!("0 {} * * *", hour)
}

/// Cron day-of-week counts from Sunday = 0.
pub fn weekly_cron(day: Weekday, hour: u32) -> String {
    format!("0 {} * * {}", hour, day.num_days_from_sunday())
}

/// Compute the next occurrence strictly after `after`.
pub fn compute_next_run(cron_expr: &str, after: &DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let cron: Cron = cron_expr
        .parse()
        .map_err(|e| anyhow::anyhow!("Failed to parse cron '{}': {}", cron_expr, e))?;

    cron.find_next_occurrence(after, false)
        .map_err(|e| anyhow::anyhow!("No next occurrence for '{}': {}", cron_expr, e))
}

/// The five jobs with their first run after `now`.
pub fn build_jobs(config: &AppConfig, now: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledJob>> {
    let schedule = &config.schedule;
    let specs = [
        (JobKind::Checkin, daily_cron(schedule.checkin_hour)),
        (JobKind::Reflection, daily_cron(schedule.reflection_hour)),
        (JobKind::ChoresMorning, daily_cron(schedule.chores_morning_hour)),
        (JobKind::ChoresConfirm, daily_cron(schedule.chores_confirm_hour)),
        (
            JobKind::WeeklyReview,
            weekly_cron(config.weekly_review_weekday(), schedule.weekly_review_hour),
        ),
    ];

    specs
        .into_iter()
        .map(|(kind, cron_expr)| {
            let next_run = compute_next_run(&cron_expr, &now)?;
            Ok(ScheduledJob {
                kind,
                cron_expr,
                next_run,
            })
        })
        .collect()
}

pub struct Scheduler {
    store: Arc<dyn StateStore>,
    coach: Arc<Coach>,
    channel: Arc<dyn Channel>,
    allowed_chat_id: Option<i64>,
    jobs: Mutex<Vec<ScheduledJob>>,
    tick_interval: Duration,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn StateStore>,
        coach: Arc<Coach>,
        channel: Arc<dyn Channel>,
        allowed_chat_id: Option<i64>,
        jobs: Vec<ScheduledJob>,
        tick_interval_secs: u64,
    ) -> Self {
        Self {
            store,
            coach,
            channel,
            allowed_chat_id,
            jobs: Mutex::new(jobs),
            tick_interval: Duration::from_secs(tick_interval_secs.max(1)),
        }
    }

    /// Spawn the tick loop as a background task.
    pub fn spawn(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(self.tick_interval).await;
                let due = self.take_due(Utc::now()).await;
                for kind in due {
                    let scheduler = Arc::clone(&self);
                    tokio::spawn(async move {
                        scheduler.run_job(kind, Utc::now()).await;
                    });
                }
            }
        });

        info!("Scheduler spawned");
    }

    /// Jobs whose next run is at or before `now`; their next run is advanced.
    pub async fn take_due(&self, now: DateTime<Utc>) -> Vec<JobKind> {
        let mut jobs = self.jobs.lock().await;
        let mut due = Vec::new();
        for job in jobs.iter_mut().filter(|j| j.next_run <= now) {
            due.push(job.kind);
            match compute_next_run(&job.cron_expr, &now) {
                Ok(next) => job.next_run = next,
                Err(e) => {
                    error!(job = job.kind.name(), error = %e, "Failed to compute next run");
                    job.next_run = now + chrono::Duration::days(1);
                }
            }
        }
        due
    }

    pub async fn next_runs(&self) -> Vec<(JobKind, DateTime<Utc>)> {
        self.jobs
            .lock()
            .await
            .iter()
            .map(|j| (j.kind, j.next_run))
            .collect()
    }

    async fn target_users(&self) -> anyhow::Result<Vec<i64>> {
        match self.allowed_chat_id {
            Some(chat_id) => Ok(vec![chat_id]),
            None => self.store.list_chat_ids().await,
        }
    }

    /// Run one job for every target user. A failure or panic for one user is
    /// logged and the batch continues. Returns how many users succeeded.
    pub async fn run_job(&self, kind: JobKind, now: DateTime<Utc>) -> usize {
        let users = match self.target_users().await {
            Ok(users) => users,
            Err(e) => {
                error!(job = kind.name(), error = %e, "Failed to load target users");
                return 0;
            }
        };
        info!(
            job = kind.name(),
            channel = %self.channel.name(),
            users = users.len(),
            "Running scheduled job"
        );

        let mut succeeded = 0;
        for chat_id in users {
            let result = AssertUnwindSafe(self.run_for_user(kind, chat_id, now))
                .catch_unwind()
                .await;
            match result {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(e)) => {
                    warn!(job = kind.name(), chat_id, error = %e, "Scheduled job failed for user")
                }
                Err(_) => error!(job = kind.name(), chat_id, "Scheduled job panicked for user"),
            }
        }
        succeeded
    }

    async fn run_for_user(&self, kind: JobKind, chat_id: i64, now: DateTime<Utc>) -> anyhow::Result<()> {
        match kind {
            JobKind::Checkin => {
                let text = self.coach.checkin(chat_id, now).await?;
                self.channel
                    .send_text(chat_id, &format!("Daily Check-in\n\n{}", text))
                    .await
            }
            JobKind::WeeklyReview => {
                let text = self.coach.weekly_review(chat_id, now).await?;
                self.channel
                    .send_text(chat_id, &format!("Weekly Review\n\n{}", text))
                    .await
            }
            JobKind::Reflection => {
                let created = reflections::ensure_today(self.store.as_ref(), chat_id, now).await?;
                for question in created {
                    self.channel
                        .send_text(chat_id, &reflections::prompt_text(question))
                        .await?;
                }
                Ok(())
            }
            JobKind::ChoresMorning => self.prompt_chores(chat_id, now, CHORES_MORNING_HEADER).await,
            JobKind::ChoresConfirm => self.prompt_chores(chat_id, now, CHORES_CONFIRM_HEADER).await,
        }
    }

    /// Weekend only: send every due chore with its answer buttons.
    async fn prompt_chores(&self, chat_id: i64, now: DateTime<Utc>, header: &str) -> anyhow::Result<()> {
        let today = now.date_naive();
        if !is_weekend(today) {
            return Ok(());
        }
        self.store.ensure_default_chores(chat_id, now).await?;
        let due = self.store.list_due_chores(chat_id, today).await?;
        if due.is_empty() {
            return Ok(());
        }

        self.channel.send(chat_id, &Reply::text(header)).await?;
        for chore in &due {
            self.channel.send(chat_id, &confirmation_prompt(chore)).await?;
            self.store.mark_chore_prompted(chat_id, &chore.id, now).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockProvider, TestChannel, TestHarness};
    use crate::traits::{ChoreStore, ReflectionStore, UserStore};
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn scheduler(h: &TestHarness, channel: Arc<dyn Channel>, allowed: Option<i64>) -> Scheduler {
        Scheduler::new(h.store.clone(), h.coach.clone(), channel, allowed, Vec::new(), 30)
    }

    #[test]
    fn test_cron_strings() {
        assert_eq!(daily_cron(16), "0 16 * * *");
        assert_eq!(weekly_cron(Weekday::Sun, 17), "0 17 * * 0");
        assert_eq!(weekly_cron(Weekday::Sat, 9), "0 9 * * 6");
    }

    #[test]
    fn test_build_jobs_next_runs() {
        let config = AppConfig::default();
        // Wednesday 2026-03-18 10:00 UTC.
        let now = at(2026, 3, 18, 10);
        let jobs = build_jobs(&config, now).unwrap();
        let next = |kind| jobs.iter().find(|j| j.kind == kind).unwrap().next_run;
        assert_eq!(next(JobKind::Checkin), at(2026, 3, 18, 16));
        assert_eq!(next(JobKind::Reflection), at(2026, 3, 18, 21));
        assert_eq!(next(JobKind::ChoresMorning), at(2026, 3, 19, 8));
        assert_eq!(next(JobKind::ChoresConfirm), at(2026, 3, 18, 20));
        assert_eq!(next(JobKind::WeeklyReview), at(2026, 3, 22, 17));
    }

    #[tokio::test]
    async fn test_take_due_advances_next_run() {
        let h = TestHarness::new(None).await;
        let now = at(2026, 3, 18, 10);
        let jobs = build_jobs(&AppConfig::default(), now).unwrap();
        let s = Scheduler::new(
            h.store.clone(),
            h.coach.clone(),
            Arc::new(TestChannel::new()),
            None,
            jobs,
            30,
        );

        assert!(s.take_due(now).await.is_empty());
        let fire_at = at(2026, 3, 18, 16);
        assert_eq!(s.take_due(fire_at).await, vec![JobKind::Checkin]);
        assert!(s.take_due(fire_at).await.is_empty());
        let runs = s.next_runs().await;
        let checkin = runs.iter().find(|(k, _)| *k == JobKind::Checkin).unwrap().1;
        assert_eq!(checkin, at(2026, 3, 19, 16));
    }

    #[tokio::test]
    async fn test_checkin_reaches_every_user() {
        let h = TestHarness::with_provider(MockProvider::new()).await;
        h.store.upsert_user(1, "a", "A").await.unwrap();
        h.store.upsert_user(2, "b", "B").await.unwrap();
        let channel = Arc::new(TestChannel::new());
        let s = scheduler(&h, channel.clone(), None);

        assert_eq!(s.run_job(JobKind::Checkin, at(2026, 3, 18, 16)).await, 2);
        assert_eq!(channel.texts_for(1).await, vec!["Daily Check-in\n\nMock response"]);
        assert_eq!(channel.texts_for(2).await.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_lock_limits_targets() {
        let h = TestHarness::new(Some(2)).await;
        h.store.upsert_user(1, "a", "A").await.unwrap();
        let channel = Arc::new(TestChannel::new());
        let s = scheduler(&h, channel.clone(), Some(2));

        s.run_job(JobKind::WeeklyReview, at(2026, 3, 22, 17)).await;
        assert!(channel.texts_for(1).await.is_empty());
        assert!(channel.texts_for(2).await[0].starts_with("Weekly Review\n\n"));
    }

    #[tokio::test]
    async fn test_failing_user_does_not_block_others() {
        let h = TestHarness::new(None).await;
        h.store.upsert_user(1, "a", "A").await.unwrap();
        h.store.upsert_user(2, "b", "B").await.unwrap();
        let channel = Arc::new(TestChannel::failing_for(1));
        let s = scheduler(&h, channel.clone(), None);

        assert_eq!(s.run_job(JobKind::Checkin, at(2026, 3, 18, 16)).await, 1);
        assert_eq!(channel.texts_for(2).await.len(), 1);
    }

    struct PanickingChannel {
        inner: TestChannel,
    }

    #[async_trait]
    impl Channel for PanickingChannel {
        fn name(&self) -> String {
            "panicking".to_string()
        }

        async fn send(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()> {
            if chat_id == 1 {
                panic!("transport exploded");
            }
            self.inner.send(chat_id, reply).await
        }
    }

    #[tokio::test]
    async fn test_panicking_user_does_not_block_others() {
        let h = TestHarness::new(None).await;
        h.store.upsert_user(1, "a", "A").await.unwrap();
        h.store.upsert_user(2, "b", "B").await.unwrap();
        let channel = Arc::new(PanickingChannel {
            inner: TestChannel::new(),
        });
        let s = scheduler(&h, channel.clone(), None);

        assert_eq!(s.run_job(JobKind::Reflection, at(2026, 3, 18, 21)).await, 1);
        assert_eq!(channel.inner.texts_for(2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_reflection_job_sends_only_new_prompts() {
        let h = TestHarness::new(None).await;
        h.store.upsert_user(1, "a", "A").await.unwrap();
        let channel = Arc::new(TestChannel::new());
        let s = scheduler(&h, channel.clone(), None);

        s.run_job(JobKind::Reflection, at(2026, 3, 18, 21)).await;
        s.run_job(JobKind::Reflection, at(2026, 3, 18, 22)).await;
        let texts = channel.texts_for(1).await;
        assert_eq!(texts.len(), 2);
        assert!(texts[0].starts_with("Daily Reflection (5 min)"));
        assert_eq!(h.store.count_pending_reflections(1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_chore_prompts_only_on_weekend() {
        let h = TestHarness::new(None).await;
        h.store.upsert_user(1, "a", "A").await.unwrap();
        let channel = Arc::new(TestChannel::new());
        let s = scheduler(&h, channel.clone(), None);

        // Friday: nothing, even though chores get seeded later.
        s.run_job(JobKind::ChoresMorning, at(2026, 3, 20, 8)).await;
        assert_eq!(channel.message_count().await, 0);

        // Saturday: header plus one prompt per default chore.
        let saturday = at(2026, 3, 21, 8);
        s.run_job(JobKind::ChoresMorning, saturday).await;
        let sent = channel.messages.lock().await.clone();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].reply.text, CHORES_MORNING_HEADER);
        assert_eq!(sent[1].reply.keyboard.len(), 2);
        assert!(sent[1].reply.keyboard[0][0].data.starts_with("chore_done:"));

        let chores = h.store.list_chores(1).await.unwrap();
        assert!(chores.iter().all(|c| c.last_prompted_at == Some(saturday)));
    }

    #[tokio::test]
    async fn test_weekend_answers_shape_sunday_prompts() {
        let h = TestHarness::new(None).await;
        h.store.upsert_user(1, "a", "A").await.unwrap();
        let channel = Arc::new(TestChannel::new());
        let s = scheduler(&h, channel.clone(), None);

        let saturday = at(2026, 3, 21, 20);
        s.run_job(JobKind::ChoresConfirm, saturday).await;
        let chores = h.store.list_chores(1).await.unwrap();
        assert_eq!(chores.len(), 3);
        let (passed, not_done, ignored) = (&chores[0], &chores[1], &chores[2]);

        h.bot
            .handle_callback(1, &format!("chore_pass_weekend:{}", passed.id), "p", saturday)
            .await;
        h.bot
            .handle_callback(1, &format!("chore_not_done:{}", not_done.id), "p", saturday)
            .await;

        channel.messages.lock().await.clear();
        s.run_job(JobKind::ChoresMorning, at(2026, 3, 22, 8)).await;
        let sent = channel.messages.lock().await.clone();
        assert_eq!(sent[0].reply.text, CHORES_MORNING_HEADER);
        let prompted: Vec<&str> = sent[1..]
            .iter()
            .map(|m| m.reply.keyboard[0][0].data.as_str())
            .collect();
        assert_eq!(prompted.len(), 2);
        assert!(prompted.contains(&format!("chore_done:{}", not_done.id).as_str()));
        assert!(prompted.contains(&format!("chore_done:{}", ignored.id).as_str()));
        assert!(!prompted.iter().any(|d| d.ends_with(passed.id.as_str())));

        // The passed chore comes back on the following Saturday.
        channel.messages.lock().await.clear();
        s.run_job(JobKind::ChoresMorning, at(2026, 3, 28, 8)).await;
        let texts = channel.texts_for(1).await;
        assert!(texts.iter().any(|t| t.contains(passed.kind.name())));
    }
}
