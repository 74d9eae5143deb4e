use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::commands::{CALLBACK_TASK_DELETE, CALLBACK_TASK_DONE};
use super::{Bot, GENERIC_FAILURE_TEXT, UNAUTHORIZED_TEXT};
use crate::chores::{accepts_response, apply_response, parse_callback_action, response_status};
use crate::flow::CALLBACK_CANCEL;

const NOT_FOUND_STATUS: &str = "Status: not found/already updated.";

/// What to do with the message whose button was pressed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallbackOutcome {
    /// Short text shown as the button acknowledgement.
    pub notice: Option<String>,
    /// Show `notice` as a modal alert instead of a toast.
    pub alert: bool,
    /// Replacement text for the message; its buttons are dropped.
    pub edited_text: Option<String>,
}

impl CallbackOutcome {
    fn edit(original: &str, status: &str) -> Self {
        Self {
            edited_text: Some(format!("{}\n\n{}", original, status)),
            ..Default::default()
        }
    }

    fn alert(text: &str) -> Self {
        Self {
            notice: Some(text.to_string()),
            alert: true,
            edited_text: None,
        }
    }
}

impl Bot {
    /// Handle an inline-button press. `message_text` is the text of the
    /// message carrying the button.
    pub async fn handle_callback(
        &self,
        chat_id: i64,
        data: &str,
        message_text: &str,
        now: DateTime<Utc>,
    ) -> CallbackOutcome {
        if !self.is_authorized(chat_id) {
            warn!(chat_id, "Callback from unauthorized chat");
            return CallbackOutcome::alert(UNAUTHORIZED_TEXT);
        }

        match self.dispatch_callback(chat_id, data, message_text, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(chat_id, data, error = %e, "Failed to handle callback");
                CallbackOutcome::alert(GENERIC_FAILURE_TEXT)
            }
        }
    }

    async fn dispatch_callback(
        &self,
        chat_id: i64,
        data: &str,
        message_text: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<CallbackOutcome> {
        if data == CALLBACK_CANCEL {
            return Ok(if self.flows.cancel(chat_id).await {
                info!(chat_id, "Add flow canceled from button");
                CallbackOutcome {
                    notice: Some("Add flow canceled.".to_string()),
                    ..CallbackOutcome::edit(message_text, "Status: canceled.")
                }
            } else {
                CallbackOutcome {
                    notice: Some("Nothing to cancel.".to_string()),
                    ..Default::default()
                }
            });
        }

        let Some((action, id)) = data.split_once(':') else {
            warn!(chat_id, data, "Malformed callback data");
            return Ok(CallbackOutcome::default());
        };

        if action == CALLBACK_TASK_DONE {
            let status = if self.store.mark_task_done(chat_id, id, now).await? {
                info!(chat_id, task_id = id, "Task completed");
                "Status: completed."
            } else {
                NOT_FOUND_STATUS
            };
            return Ok(CallbackOutcome::edit(message_text, status));
        }

        if action == CALLBACK_TASK_DELETE {
            let status = if self.store.delete_task(chat_id, id).await? {
                info!(chat_id, task_id = id, "Task deleted");
                "Status: deleted."
            } else {
                NOT_FOUND_STATUS
            };
            return Ok(CallbackOutcome::edit(message_text, status));
        }

        if let Some(response) = parse_callback_action(action) {
            let Some(chore) = self.store.get_chore(chat_id, id).await? else {
                return Ok(CallbackOutcome::edit(message_text, NOT_FOUND_STATUS));
            };
            if !accepts_response(&chore, response, now.date_naive()) {
                info!(
                    chat_id,
                    chore = chore.kind.key(),
                    ?response,
                    next_due = %chore.next_due_date,
                    "Ignoring answer for a chore that is not due"
                );
                return Ok(CallbackOutcome::edit(message_text, NOT_FOUND_STATUS));
            }
            let updated = apply_response(&chore, response, now);
            self.store.update_chore(&updated).await?;
            info!(
                chat_id,
                chore = chore.kind.key(),
                ?response,
                next_due = %updated.next_due_date,
                "Chore answered"
            );
            return Ok(CallbackOutcome::edit(
                message_text,
                &response_status(response, &updated),
            ));
        }

        warn!(chat_id, data, "Unknown callback action");
        Ok(CallbackOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{now, send, setup};
    use super::*;
    use crate::traits::{ChoreStore, TaskStore};
    use chrono::{NaiveDate, TimeZone};

    #[tokio::test]
    async fn test_done_and_delete_buttons() {
        let (bot, store, _f) = setup(None).await;
        send(&bot, 1, "/add Send proposal | high").await;
        send(&bot, 1, "/add Archive emails | low").await;
        let tasks = store.list_active_tasks(1, 10).await.unwrap();

        let outcome = bot
            .handle_callback(1, &format!("done:{}", tasks[0].id), "[1] Send proposal", now())
            .await;
        assert_eq!(
            outcome.edited_text.as_deref(),
            Some("[1] Send proposal\n\nStatus: completed.")
        );

        let again = bot
            .handle_callback(1, &format!("done:{}", tasks[0].id), "card", now())
            .await;
        assert_eq!(
            again.edited_text.as_deref(),
            Some("card\n\nStatus: not found/already updated.")
        );

        let outcome = bot
            .handle_callback(1, &format!("delete:{}", tasks[1].id), "card", now())
            .await;
        assert_eq!(outcome.edited_text.as_deref(), Some("card\n\nStatus: deleted."));
        assert!(store.list_active_tasks(1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_chat_cannot_touch_task() {
        let (bot, store, _f) = setup(None).await;
        send(&bot, 1, "/add Private thing").await;
        let id = store.list_active_tasks(1, 10).await.unwrap()[0].id.clone();
        let outcome = bot
            .handle_callback(2, &format!("delete:{}", id), "card", now())
            .await;
        assert!(outcome.edited_text.unwrap().ends_with(NOT_FOUND_STATUS));
        assert_eq!(store.list_active_tasks(1, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_callback_alerts() {
        let (bot, _store, _f) = setup(Some(42)).await;
        let outcome = bot.handle_callback(7, "done:abc", "card", now()).await;
        assert_eq!(outcome.notice.as_deref(), Some(UNAUTHORIZED_TEXT));
        assert!(outcome.alert);
        assert!(outcome.edited_text.is_none());
    }

    #[tokio::test]
    async fn test_cancel_button_ends_flow() {
        let (bot, _store, _f) = setup(None).await;
        send(&bot, 1, "/add").await;
        send(&bot, 1, "Draft blog post").await;
        let outcome = bot
            .handle_callback(1, CALLBACK_CANCEL, "Send priority", now())
            .await;
        assert_eq!(outcome.notice.as_deref(), Some("Add flow canceled."));
        assert!(!bot.flows().is_active(1).await);

        let outcome = bot.handle_callback(1, CALLBACK_CANCEL, "x", now()).await;
        assert_eq!(outcome.notice.as_deref(), Some("Nothing to cancel."));
    }

    #[tokio::test]
    async fn test_chore_buttons_reschedule() {
        let (bot, store, _f) = setup(None).await;
        send(&bot, 1, "/start").await;
        let chore = store.list_chores(1).await.unwrap()[0].clone();

        // Saturday 2026-03-21: not done moves it to Sunday.
        let saturday = Utc.with_ymd_and_hms(2026, 3, 21, 20, 0, 0).unwrap();
        let outcome = bot
            .handle_callback(1, &format!("chore_not_done:{}", chore.id), "prompt", saturday)
            .await;
        assert!(outcome.edited_text.unwrap().contains("Status: not done"));
        let stored = store.get_chore(1, &chore.id).await.unwrap().unwrap();
        assert_eq!(stored.next_due_date, NaiveDate::from_ymd_opt(2026, 3, 22).unwrap());

        // Passing on Sunday skips to the following weekend.
        let sunday = Utc.with_ymd_and_hms(2026, 3, 22, 9, 0, 0).unwrap();
        bot.handle_callback(1, &format!("chore_pass_weekend:{}", chore.id), "prompt", sunday)
            .await;
        let stored = store.get_chore(1, &chore.id).await.unwrap().unwrap();
        assert_eq!(stored.next_due_date, NaiveDate::from_ymd_opt(2026, 3, 28).unwrap());
        assert!(stored.passed_for_weekend);

        let outcome = bot
            .handle_callback(1, "chore_done:missing", "prompt", sunday)
            .await;
        assert!(outcome.edited_text.unwrap().ends_with(NOT_FOUND_STATUS));
    }

    #[tokio::test]
    async fn test_older_chore_prompt_cannot_pull_due_date_back() {
        let (bot, store, _f) = setup(None).await;
        send(&bot, 1, "/start").await;
        let chore = store
            .list_chores(1)
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.interval_days >= 30)
            .unwrap();

        let saturday = Utc.with_ymd_and_hms(2026, 3, 21, 20, 0, 0).unwrap();
        bot.handle_callback(1, &format!("chore_done:{}", chore.id), "evening prompt", saturday)
            .await;
        let after_done = store.get_chore(1, &chore.id).await.unwrap().unwrap();
        assert!(after_done.next_due_date > saturday.date_naive() + chrono::Duration::days(7));

        let sunday = Utc.with_ymd_and_hms(2026, 3, 22, 9, 0, 0).unwrap();
        for action in ["chore_pass_weekend", "chore_not_done"] {
            let outcome = bot
                .handle_callback(1, &format!("{}:{}", action, chore.id), "morning prompt", sunday)
                .await;
            assert!(outcome.edited_text.unwrap().ends_with(NOT_FOUND_STATUS));
        }
        let stored = store.get_chore(1, &chore.id).await.unwrap().unwrap();
        assert_eq!(stored.next_due_date, after_done.next_due_date);
        assert!(!stored.passed_for_weekend);
    }
}
