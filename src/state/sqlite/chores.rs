use super::*;

use crate::chores::{next_weekday_on_or_after, DEFAULT_PREFERRED_WEEKDAY};

#[async_trait]
impl crate::traits::ChoreStore for SqliteStateStore {
    async fn ensure_default_chores(&self, chat_id: i64, now: DateTime<Utc>) -> anyhow::Result<()> {
        let first_due = fmt_day(next_weekday_on_or_after(
            now.date_naive(),
            DEFAULT_PREFERRED_WEEKDAY,
        ));
        let now = fmt_ts(now);
        for kind in ChoreKind::ALL {
            sqlx::query(
                "INSERT OR IGNORE INTO chores
                    (id, chat_id, kind, interval_days, preferred_weekday, next_due_date, passed_for_weekend, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(chat_id)
            .bind(kind.key())
            .bind(kind.default_interval_days())
            .bind(DEFAULT_PREFERRED_WEEKDAY as i64)
            .bind(&first_due)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn list_chores(&self, chat_id: i64) -> anyhow::Result<Vec<Chore>> {
        let rows = sqlx::query(
            "SELECT * FROM chores WHERE chat_id = ? ORDER BY next_due_date ASC, kind ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().filter_map(chore_from_row).collect())
    }

    async fn list_due_chores(&self, chat_id: i64, day: NaiveDate) -> anyhow::Result<Vec<Chore>> {
        let rows = sqlx::query(
            "SELECT * FROM chores WHERE chat_id = ? AND next_due_date <= ?
             ORDER BY next_due_date ASC, kind ASC",
        )
        .bind(chat_id)
        .bind(fmt_day(day))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().filter_map(chore_from_row).collect())
    }

    async fn get_chore(&self, chat_id: i64, chore_id: &str) -> anyhow::Result<Option<Chore>> {
        let row = sqlx::query("SELECT * FROM chores WHERE id = ? AND chat_id = ?")
            .bind(chore_id)
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().and_then(chore_from_row))
    }

    async fn update_chore(&self, chore: &Chore) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE chores SET
                interval_days = ?, preferred_weekday = ?, next_due_date = ?,
                last_completed_at = ?, last_prompted_at = ?, passed_for_weekend = ?, updated_at = ?
             WHERE id = ? AND chat_id = ?",
        )
        .bind(chore.interval_days)
        .bind(chore.preferred_weekday as i64)
        .bind(fmt_day(chore.next_due_date))
        .bind(chore.last_completed_at.map(fmt_ts))
        .bind(chore.last_prompted_at.map(fmt_ts))
        .bind(chore.passed_for_weekend as i64)
        .bind(fmt_ts(chore.updated_at))
        .bind(&chore.id)
        .bind(chore.chat_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_chore_prompted(
        &self,
        chat_id: i64,
        chore_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let ts = fmt_ts(now);
        sqlx::query(
            "UPDATE chores SET last_prompted_at = ?, updated_at = ? WHERE id = ? AND chat_id = ?",
        )
        .bind(&ts)
        .bind(&ts)
        .bind(chore_id)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
