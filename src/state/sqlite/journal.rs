use super::*;

use crate::utils::{clip_chars, collapse_whitespace};

const MAX_ENTRY_CHARS: usize = 1200;

#[async_trait]
impl crate::traits::JournalStore for SqliteStateStore {
    async fn add_journal_entry(
        &self,
        chat_id: i64,
        text: &str,
        source: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<JournalEntry>> {
        let cleaned = clip_chars(&collapse_whitespace(text), MAX_ENTRY_CHARS);
        if cleaned.is_empty() {
            return Ok(None);
        }
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO journal_entries (id, chat_id, text, source, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(chat_id)
        .bind(&cleaned)
        .bind(source)
        .bind(fmt_ts(now))
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM journal_entries WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.pool)
            .await?;
        Ok(Some(journal_from_row(&row)))
    }

    async fn get_recent_journal_entries(
        &self,
        chat_id: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT text FROM journal_entries WHERE chat_id = ?
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(chat_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get("text")).collect())
    }
}
