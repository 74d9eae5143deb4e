use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::traits::{Chore, JournalEntry, ReflectionPrompt, Task, UserProfile};
use crate::types::{ChoreKind, Priority, ReflectionStatus, TaskStatus};

/// Set restrictive file permissions (0600) on the database and WAL files.
#[cfg(unix)]
fn set_db_file_permissions(db_path: &str) {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::Permissions::from_mode(0o600);
    for suffix in ["", "-wal", "-shm"] {
        let path = format!("{}{}", db_path, suffix);
        if std::path::Path::new(&path).exists() {
            if let Err(e) = std::fs::set_permissions(&path, mode.clone()) {
                tracing::warn!("Failed to set permissions on {}: {}", path, e);
            }
        }
    }
}

#[cfg(not(unix))]
fn set_db_file_permissions(_db_path: &str) {}

/// Fixed-width UTC timestamps so lexical order matches time order.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_ts_or_epoch(raw: &str) -> DateTime<Utc> {
    parse_ts(raw).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub(crate) fn fmt_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn parse_day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap_or_default()
}

fn opt_ts(row: &SqliteRow, column: &str) -> Option<DateTime<Utc>> {
    let raw: Option<String> = row.get(column);
    raw.as_deref().and_then(parse_ts)
}

pub(crate) fn user_from_row(row: &SqliteRow) -> UserProfile {
    UserProfile {
        chat_id: row.get("chat_id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        main_goal: row.get("main_goal"),
        created_at: parse_ts_or_epoch(&row.get::<String, _>("created_at")),
        updated_at: parse_ts_or_epoch(&row.get::<String, _>("updated_at")),
    }
}

pub(crate) fn task_from_row(row: &SqliteRow) -> Task {
    Task {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        title: row.get("title"),
        priority: Priority::from_rank(row.get("priority")),
        project_type: row.get("project_type"),
        deadline: opt_ts(row, "deadline"),
        status: TaskStatus::parse(&row.get::<String, _>("status")),
        created_at: parse_ts_or_epoch(&row.get::<String, _>("created_at")),
        updated_at: parse_ts_or_epoch(&row.get::<String, _>("updated_at")),
        completed_at: opt_ts(row, "completed_at"),
        last_nudged_at: opt_ts(row, "last_nudged_at"),
    }
}

pub(crate) fn journal_from_row(row: &SqliteRow) -> JournalEntry {
    JournalEntry {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        text: row.get("text"),
        source: row.get("source"),
        created_at: parse_ts_or_epoch(&row.get::<String, _>("created_at")),
    }
}

pub(crate) fn reflection_from_row(row: &SqliteRow) -> ReflectionPrompt {
    ReflectionPrompt {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        prompt_date: parse_day(&row.get::<String, _>("prompt_date")),
        question_key: row.get("question_key"),
        question: row.get("question"),
        status: ReflectionStatus::parse(&row.get::<String, _>("status")),
        answer: row.get("answer"),
        asked_at: parse_ts_or_epoch(&row.get::<String, _>("asked_at")),
        answered_at: opt_ts(row, "answered_at"),
    }
}

/// Rows with an unknown chore kind are skipped.
pub(crate) fn chore_from_row(row: &SqliteRow) -> Option<Chore> {
    let kind_raw: String = row.get("kind");
    let Some(kind) = ChoreKind::from_key(&kind_raw) else {
        tracing::warn!(kind = %kind_raw, "Skipping chore with unknown kind");
        return None;
    };
    let weekday: i64 = row.get("preferred_weekday");
    let passed: i64 = row.get("passed_for_weekend");
    Some(Chore {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        kind,
        interval_days: row.get("interval_days"),
        preferred_weekday: weekday.clamp(0, 6) as u32,
        next_due_date: parse_day(&row.get::<String, _>("next_due_date")),
        last_completed_at: opt_ts(row, "last_completed_at"),
        last_prompted_at: opt_ts(row, "last_prompted_at"),
        passed_for_weekend: passed != 0,
        updated_at: parse_ts_or_epoch(&row.get::<String, _>("updated_at")),
    })
}

pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub async fn new(db_path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        set_db_file_permissions(db_path);

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                chat_id INTEGER PRIMARY KEY,
                username TEXT NOT NULL DEFAULT '',
                first_name TEXT NOT NULL DEFAULT '',
                main_goal TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                chat_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 2,
                project_type TEXT NOT NULL DEFAULT 'general',
                deadline TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT,
                last_nudged_at TEXT
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_chat_status ON tasks(chat_id, status)")
            .execute(&pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS journal_entries (
                id TEXT PRIMARY KEY,
                chat_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_journal_chat_created ON journal_entries(chat_id, created_at)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS reflection_prompts (
                id TEXT PRIMARY KEY,
                chat_id INTEGER NOT NULL,
                prompt_date TEXT NOT NULL,
                question_key TEXT NOT NULL,
                question TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                answer TEXT,
                asked_at TEXT NOT NULL,
                answered_at TEXT,
                UNIQUE(chat_id, prompt_date, question_key)
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chores (
                id TEXT PRIMARY KEY,
                chat_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                interval_days INTEGER NOT NULL,
                preferred_weekday INTEGER NOT NULL DEFAULT 5,
                next_due_date TEXT NOT NULL,
                last_completed_at TEXT,
                last_prompted_at TEXT,
                passed_for_weekend INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                UNIQUE(chat_id, kind)
            )",
        )
        .execute(&pool)
        .await?;

        tracing::info!(path = %db_path, "State store ready");
        Ok(Self { pool })
    }
}

mod chores;
mod journal;
mod reflections;
mod tasks;
mod users;
