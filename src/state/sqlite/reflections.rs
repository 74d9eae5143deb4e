use super::*;

const OLDEST_PENDING: &str = "SELECT * FROM reflection_prompts
     WHERE chat_id = ? AND status = 'pending'
     ORDER BY prompt_date ASC, asked_at ASC, rowid ASC LIMIT 1";

impl SqliteStateStore {
    /// Move the oldest pending prompt to `status`, storing `answer`.
    async fn resolve_pending(
        &self,
        chat_id: i64,
        status: ReflectionStatus,
        answer: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ReflectionPrompt>> {
        let mut tx = self.pool.begin().await?;
        let Some(row) = sqlx::query(OLDEST_PENDING)
            .bind(chat_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let mut prompt = reflection_from_row(&row);

        sqlx::query(
            "UPDATE reflection_prompts SET status = ?, answer = ?, answered_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(answer)
        .bind(fmt_ts(now))
        .bind(&prompt.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        prompt.status = status;
        prompt.answer = Some(answer.to_string());
        prompt.answered_at = Some(now);
        Ok(Some(prompt))
    }
}

#[async_trait]
impl crate::traits::ReflectionStore for SqliteStateStore {
    async fn ensure_reflection_prompt(
        &self,
        chat_id: i64,
        prompt_date: NaiveDate,
        question_key: &str,
        question: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO reflection_prompts
                (id, chat_id, prompt_date, question_key, question, status, asked_at)
             VALUES (?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(chat_id)
        .bind(fmt_day(prompt_date))
        .bind(question_key)
        .bind(question)
        .bind(fmt_ts(now))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_pending_reflection(
        &self,
        chat_id: i64,
    ) -> anyhow::Result<Option<ReflectionPrompt>> {
        let row = sqlx::query(OLDEST_PENDING)
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(reflection_from_row))
    }

    async fn count_pending_reflections(&self, chat_id: i64) -> anyhow::Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) FROM reflection_prompts WHERE chat_id = ? AND status = 'pending'",
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn answer_pending_reflection(
        &self,
        chat_id: i64,
        answer: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ReflectionPrompt>> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        self.resolve_pending(chat_id, ReflectionStatus::Answered, answer, now)
            .await
    }

    async fn skip_pending_reflection(
        &self,
        chat_id: i64,
        note: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ReflectionPrompt>> {
        self.resolve_pending(chat_id, ReflectionStatus::Skipped, note, now)
            .await
    }

    async fn get_recent_reflection_answers(
        &self,
        chat_id: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT question, answer FROM reflection_prompts
             WHERE chat_id = ? AND status = 'answered'
             ORDER BY answered_at DESC, rowid DESC LIMIT ?",
        )
        .bind(chat_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| {
                let question: String = r.get("question");
                let answer: Option<String> = r.get("answer");
                format!("{} -> {}", question, answer.unwrap_or_default())
            })
            .collect())
    }
}
