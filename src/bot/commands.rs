use chrono::{DateTime, Utc};
use tracing::info;

use super::{Bot, IncomingMessage, HELP_TEXT};
use crate::chores::{confirmation_prompt, schedule_line};
use crate::parsing::{format_day, format_deadline, parse_add_payload};
use crate::traits::{NewTask, Task, DEFAULT_MAIN_GOAL};
use crate::types::{Button, Reply};

const LIST_LIMIT: usize = 30;

pub(super) const CALLBACK_TASK_DONE: &str = "done";
pub(super) const CALLBACK_TASK_DELETE: &str = "delete";

pub(super) fn added_line(task: &Task) -> String {
    format!(
        "Added: {} | priority {} | deadline {}",
        task.title,
        task.priority.label(),
        format_deadline(task.deadline)
    )
}

fn task_card(index: usize, task: &Task) -> Reply {
    let text = format!(
        "[{}] {}\nType: {}\nPriority: {}\nDeadline: {}\nAdded: {}\nTask ID: {}",
        index,
        task.title,
        task.project_type,
        task.priority.label(),
        format_deadline(task.deadline),
        format_day(Some(task.created_at)),
        task.id
    );
    Reply::with_keyboard(
        text,
        vec![vec![
            Button::new("Done", format!("{}:{}", CALLBACK_TASK_DONE, task.id)),
            Button::new("Delete", format!("{}:{}", CALLBACK_TASK_DELETE, task.id)),
        ]],
    )
}

impl Bot {
    pub(super) async fn handle_command(
        &self,
        msg: &IncomingMessage,
        name: &str,
        args: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Reply>> {
        let chat_id = msg.chat_id;
        info!(chat_id, command = name, "Command received");

        // /cancel must work even if the store is down.
        if name == "cancel" {
            return Ok(vec![self.cancel(chat_id).await]);
        }

        self.ensure_user(msg, now).await?;

        let replies = match name {
            "start" => vec![Reply::text(format!("To-Do Coach is active.\n\n{}", HELP_TEXT))],
            "help" => vec![Reply::text(HELP_TEXT)],
            "add" if args.is_empty() => vec![self.flows.start(chat_id).await],
            "add" => vec![self.quick_add(chat_id, args, now).await?],
            "list" => self.list(chat_id).await?,
            "goal" => vec![self.goal(chat_id, args).await?],
            "checkin" => vec![Reply::text(self.coach.checkin(chat_id, now).await?)],
            "review" => vec![Reply::text(self.coach.weekly_review(chat_id, now).await?)],
            "improve" => vec![Reply::text(self.coach.improvement(chat_id, now).await?)],
            "reflect" => self.reflect(chat_id, now).await?,
            "pass" => self.pass(chat_id, now).await?,
            "chores" => self.chores(chat_id, now).await?,
            _ => vec![Reply::text("Unknown command. Send /help to see what I can do.")],
        };
        Ok(replies)
    }

    /// Create or refresh the profile and seed default chores.
    async fn ensure_user(&self, msg: &IncomingMessage, now: DateTime<Utc>) -> anyhow::Result<()> {
        self.store
            .upsert_user(msg.chat_id, &msg.username, &msg.first_name)
            .await?;
        self.store
            .ensure_default_chores(msg.chat_id, now)
            .await
    }

    pub(super) async fn cancel(&self, chat_id: i64) -> Reply {
        if self.flows.cancel(chat_id).await {
            Reply::text("Add flow canceled.")
        } else {
            Reply::text("Nothing to cancel.")
        }
    }

    async fn quick_add(&self, chat_id: i64, args: &str, now: DateTime<Utc>) -> anyhow::Result<Reply> {
        let parsed = match parse_add_payload(args) {
            Ok(parsed) => parsed,
            Err(message) => {
                return Ok(Reply::text(format!(
                    "{}\nExample: /add Call lead | high | 2026-03-01",
                    message
                )))
            }
        };
        let task = self
            .store
            .add_task(
                chat_id,
                &NewTask {
                    title: parsed.title,
                    priority: parsed.priority,
                    deadline: parsed.deadline,
                },
                now,
            )
            .await?;
        info!(chat_id, task_id = %task.id, "Task added");
        Ok(Reply::text(added_line(&task)))
    }

    async fn list(&self, chat_id: i64) -> anyhow::Result<Vec<Reply>> {
        let tasks = self.store.list_active_tasks(chat_id, LIST_LIMIT).await?;
        if tasks.is_empty() {
            return Ok(vec![Reply::text("No active tasks.")]);
        }
        let mut replies = vec![Reply::text(
            "Active tasks. Use each task's buttons to mark done or delete.",
        )];
        replies.extend(
            tasks
                .iter()
                .enumerate()
                .map(|(i, task)| task_card(i + 1, task)),
        );
        Ok(replies)
    }

    async fn goal(&self, chat_id: i64, args: &str) -> anyhow::Result<Reply> {
        let goal = args.trim();
        if goal.is_empty() {
            let current = self
                .store
                .get_user_profile(chat_id)
                .await?
                .map(|p| p.main_goal)
                .unwrap_or_else(|| DEFAULT_MAIN_GOAL.to_string());
            return Ok(Reply::text(format!("Current main goal: {}", current)));
        }
        self.store.set_main_goal(chat_id, goal).await?;
        Ok(Reply::text(format!("Main goal updated: {}", goal)))
    }

    async fn chores(&self, chat_id: i64, now: DateTime<Utc>) -> anyhow::Result<Vec<Reply>> {
        let due = self.store.list_due_chores(chat_id, now.date_naive()).await?;
        if !due.is_empty() {
            let mut replies = vec![Reply::text(
                "Weekend chores pending confirmation. Mark each one when done:",
            )];
            replies.extend(due.iter().map(confirmation_prompt));
            return Ok(replies);
        }

        let all = self.store.list_chores(chat_id).await?;
        if all.is_empty() {
            return Ok(vec![Reply::text("No recurring chores configured.")]);
        }
        let mut text = String::from("No overdue chores right now. Upcoming schedule:");
        for chore in &all {
            text.push('\n');
            text.push_str(&schedule_line(chore));
        }
        Ok(vec![Reply::text(text)])
    }
}
