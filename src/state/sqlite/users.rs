use super::*;

use crate::traits::DEFAULT_MAIN_GOAL;

#[async_trait]
impl crate::traits::UserStore for SqliteStateStore {
    async fn upsert_user(
        &self,
        chat_id: i64,
        username: &str,
        first_name: &str,
    ) -> anyhow::Result<UserProfile> {
        let now = fmt_ts(Utc::now());
        sqlx::query(
            "INSERT INTO users (chat_id, username, first_name, main_goal, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(chat_id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                updated_at = excluded.updated_at",
        )
        .bind(chat_id)
        .bind(username)
        .bind(first_name)
        .bind(DEFAULT_MAIN_GOAL)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM users WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user_from_row(&row))
    }

    async fn get_user_profile(&self, chat_id: i64) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM users WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn list_chat_ids(&self) -> anyhow::Result<Vec<i64>> {
        let rows = sqlx::query("SELECT chat_id FROM users ORDER BY chat_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get("chat_id")).collect())
    }

    async fn set_main_goal(&self, chat_id: i64, main_goal: &str) -> anyhow::Result<()> {
        let goal = main_goal.trim();
        if goal.is_empty() {
            anyhow::bail!("Goal cannot be empty.");
        }
        let now = fmt_ts(Utc::now());
        sqlx::query(
            "INSERT INTO users (chat_id, main_goal, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(chat_id) DO UPDATE SET
                main_goal = excluded.main_goal,
                updated_at = excluded.updated_at",
        )
        .bind(chat_id)
        .bind(goal)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
