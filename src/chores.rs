//! Weekend chore cycle: when a chore is due again after each kind of answer.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::parsing::format_day;
use crate::traits::Chore;
use crate::types::{Button, ChoreResponse, Reply};

pub const CALLBACK_DONE: &str = "chore_done";
pub const CALLBACK_NOT_DONE: &str = "chore_not_done";
pub const CALLBACK_PASS_WEEKEND: &str = "chore_pass_weekend";

/// Chores land on Saturday unless configured otherwise.
pub const DEFAULT_PREFERRED_WEEKDAY: u32 = 5;

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `weekday` counts from Monday = 0.
pub fn next_weekday_on_or_after(day: NaiveDate, weekday: u32) -> NaiveDate {
    let current = day.weekday().num_days_from_monday();
    let delta = (weekday % 7 + 7 - current) % 7;
    day + Duration::days(delta as i64)
}

/// Saturday → Sunday, Sunday → next Saturday, any weekday → the coming Saturday.
pub fn next_weekend_day(today: NaiveDate) -> NaiveDate {
    match today.weekday() {
        Weekday::Sat => today + Duration::days(1),
        Weekday::Sun => today + Duration::days(6),
        _ => next_weekday_on_or_after(today, 5),
    }
}

/// Saturday of the weekend after the current (or coming) one.
pub fn next_weekend_cycle(today: NaiveDate) -> NaiveDate {
    match today.weekday() {
        Weekday::Sat => today + Duration::days(7),
        Weekday::Sun => today + Duration::days(6),
        _ => next_weekday_on_or_after(today, 5) + Duration::days(7),
    }
}

/// New chore state after the user answers a confirmation prompt.
pub fn apply_response(chore: &Chore, response: ChoreResponse, now: DateTime<Utc>) -> Chore {
    let today = now.date_naive();
    let mut next = chore.clone();
    next.updated_at = now;
    match response {
        ChoreResponse::Done => {
            let raw_due = today + Duration::days(chore.interval_days.max(1));
            next.next_due_date = next_weekday_on_or_after(raw_due, chore.preferred_weekday);
            next.last_completed_at = Some(now);
            next.passed_for_weekend = false;
        }
        ChoreResponse::NotDone => {
            next.next_due_date = next_weekend_day(today);
            next.passed_for_weekend = false;
        }
        ChoreResponse::Passed => {
            next.next_due_date = next_weekend_cycle(today);
            next.passed_for_weekend = true;
        }
    }
    next
}

/// Not done and pass only apply to a chore that is due; a press on an older
/// prompt after the chore was already rescheduled is ignored.
pub fn accepts_response(chore: &Chore, response: ChoreResponse, today: NaiveDate) -> bool {
    match response {
        ChoreResponse::Done => true,
        ChoreResponse::NotDone | ChoreResponse::Passed => chore.next_due_date <= today,
    }
}

pub fn parse_callback_action(action: &str) -> Option<ChoreResponse> {
    match action {
        CALLBACK_DONE => Some(ChoreResponse::Done),
        CALLBACK_NOT_DONE => Some(ChoreResponse::NotDone),
        CALLBACK_PASS_WEEKEND => Some(ChoreResponse::Passed),
        _ => None,
    }
}

fn since_line(chore: &Chore) -> String {
    format!("Due since: {}", chore.next_due_date.format("%Y-%m-%d"))
}

/// Confirmation prompt with the full Done / Not done / Pass weekend keyboard.
pub fn confirmation_prompt(chore: &Chore) -> Reply {
    Reply::with_keyboard(
        format!("{}\n{}\n\nDone today?", chore.kind.name(), since_line(chore)),
        vec![
            vec![
                Button::new("Done", format!("{}:{}", CALLBACK_DONE, chore.id)),
                Button::new("Not done", format!("{}:{}", CALLBACK_NOT_DONE, chore.id)),
            ],
            vec![Button::new(
                "Pass weekend",
                format!("{}:{}", CALLBACK_PASS_WEEKEND, chore.id),
            )],
        ],
    )
}

/// Status line appended to the prompt once the user answered.
pub fn response_status(response: ChoreResponse, updated: &Chore) -> String {
    let next_due = updated.next_due_date.format("%Y-%m-%d");
    match response {
        ChoreResponse::Done => format!("Status: confirmed done. Next due: {}.", next_due),
        ChoreResponse::NotDone => format!("Status: not done. I'll ask again on {}.", next_due),
        ChoreResponse::Passed => format!("Status: passed for this weekend. Back on {}.", next_due),
    }
}

/// One line of the `/chores` schedule overview.
pub fn schedule_line(chore: &Chore) -> String {
    let mut line = format!(
        "- {}: every {} day(s), next due {}, last done {}",
        chore.kind.name(),
        chore.interval_days,
        chore.next_due_date.format("%Y-%m-%d"),
        format_day(chore.last_completed_at)
    );
    if chore.passed_for_weekend {
        line.push_str(" (passed this weekend)");
    }
    line
}
