use super::*;

use chrono::Duration;

use crate::parsing::{default_deadline, infer_project_type, TITLE_ERROR};
use crate::traits::{NewTask, TaskStats};

const ACTIVE_ORDER: &str = "ORDER BY priority ASC, deadline IS NULL, deadline ASC, created_at ASC";

impl SqliteStateStore {
    async fn count_tasks(&self, sql: &str, chat_id: i64, since: &str) -> anyhow::Result<i64> {
        let row = sqlx::query(sql)
            .bind(chat_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>(0))
    }
}

#[async_trait]
impl crate::traits::TaskStore for SqliteStateStore {
    async fn add_task(
        &self,
        chat_id: i64,
        task: &NewTask,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Task> {
        let title = task.title.trim();
        if title.is_empty() {
            anyhow::bail!(TITLE_ERROR);
        }
        let created = Task {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id,
            title: title.to_string(),
            priority: task.priority,
            project_type: infer_project_type(title).to_string(),
            deadline: Some(task.deadline.unwrap_or_else(|| default_deadline(now))),
            status: TaskStatus::Active,
            created_at: now,
            updated_at: now,
            completed_at: None,
            last_nudged_at: None,
        };

        sqlx::query(
            "INSERT INTO tasks (id, chat_id, title, priority, project_type, deadline, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&created.id)
        .bind(chat_id)
        .bind(&created.title)
        .bind(created.priority.rank())
        .bind(&created.project_type)
        .bind(created.deadline.map(fmt_ts))
        .bind(created.status.as_str())
        .bind(fmt_ts(now))
        .bind(fmt_ts(now))
        .execute(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_active_tasks(&self, chat_id: i64, limit: usize) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM tasks WHERE chat_id = ? AND status = 'active' {} LIMIT ?",
            ACTIVE_ORDER
        ))
        .bind(chat_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(task_from_row).collect())
    }

    async fn get_stale_tasks(
        &self,
        chat_id: i64,
        stale_days: i64,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<Task>> {
        let cutoff = fmt_ts(now - Duration::days(stale_days));
        let rows = sqlx::query(
            "SELECT * FROM tasks
             WHERE chat_id = ? AND status = 'active' AND created_at <= ?
             ORDER BY created_at ASC LIMIT ?",
        )
        .bind(chat_id)
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(task_from_row).collect())
    }

    async fn get_overdue_tasks(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT * FROM tasks
             WHERE chat_id = ? AND status = 'active' AND deadline IS NOT NULL AND deadline < ?
             ORDER BY deadline ASC LIMIT ?",
        )
        .bind(chat_id)
        .bind(fmt_ts(now))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(task_from_row).collect())
    }

    async fn get_recent_completed_tasks(
        &self,
        chat_id: i64,
        days: i64,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<Task>> {
        let since = fmt_ts(now - Duration::days(days));
        let rows = sqlx::query(
            "SELECT * FROM tasks
             WHERE chat_id = ? AND status = 'done' AND completed_at >= ?
             ORDER BY completed_at DESC LIMIT ?",
        )
        .bind(chat_id)
        .bind(since)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(task_from_row).collect())
    }

    async fn mark_task_done(
        &self,
        chat_id: i64,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let ts = fmt_ts(now);
        let result = sqlx::query(
            "UPDATE tasks SET status = 'done', completed_at = ?, updated_at = ?
             WHERE id = ? AND chat_id = ? AND status = 'active'",
        )
        .bind(&ts)
        .bind(&ts)
        .bind(task_id)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&self, chat_id: i64, task_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND chat_id = ?")
            .bind(task_id)
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_tasks_nudged(
        &self,
        chat_id: i64,
        task_ids: &[String],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if task_ids.is_empty() {
            return Ok(());
        }
        let ts = fmt_ts(now);
        let mut tx = self.pool.begin().await?;
        for id in task_ids {
            sqlx::query("UPDATE tasks SET last_nudged_at = ? WHERE id = ? AND chat_id = ?")
                .bind(&ts)
                .bind(id)
                .bind(chat_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_task_stats(&self, chat_id: i64, now: DateTime<Utc>) -> anyhow::Result<TaskStats> {
        let week = fmt_ts(now - Duration::days(7));
        let month = fmt_ts(now - Duration::days(30));

        let active = sqlx::query(
            "SELECT COUNT(*) FROM tasks WHERE chat_id = ? AND status = 'active'",
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await?
        .get::<i64, _>(0);

        let done_sql = "SELECT COUNT(*) FROM tasks WHERE chat_id = ? AND status = 'done' AND completed_at >= ?";
        let created_sql = "SELECT COUNT(*) FROM tasks WHERE chat_id = ? AND created_at >= ?";

        Ok(TaskStats {
            active,
            done_7d: self.count_tasks(done_sql, chat_id, &week).await?,
            done_30d: self.count_tasks(done_sql, chat_id, &month).await?,
            created_7d: self.count_tasks(created_sql, chat_id, &week).await?,
            created_30d: self.count_tasks(created_sql, chat_id, &month).await?,
        })
    }
}
