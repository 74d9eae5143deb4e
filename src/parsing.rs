//! Parsing and formatting of user-typed task fields.

use chrono::{DateTime, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Priority;

pub const PRIORITY_ERROR: &str = "Priority must be high/medium/low, p1/p2/p3, or 1/2/3.";
pub const DEADLINE_ERROR: &str = "Deadline must be in YYYY-MM-DD format, or use `skip`.";
pub const TITLE_ERROR: &str = "Task title is required.";
pub const EMPTY_ADD_ERROR: &str = "Empty task. Use: /add Task | high | 2026-03-01";

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap());
static PRIORITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(p[123]|high|medium|med|low|urgent|[123])\b").unwrap()
});

/// Normalize any accepted priority spelling to a [`Priority`].
pub fn parse_priority(raw: &str) -> Option<Priority> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "p1" | "high" | "urgent" => Some(Priority::High),
        "2" | "p2" | "medium" | "med" => Some(Priority::Medium),
        "3" | "p3" | "low" => Some(Priority::Low),
        _ => None,
    }
}

/// Last second of `day` in UTC; deadlines stay open for the whole calendar day.
pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&day.and_time(time))
}

/// Deadline used when the user skips it: same day next month (clamped to the
/// month's last day), end of day.
pub fn default_deadline(created_at: DateTime<Utc>) -> DateTime<Utc> {
    let today = created_at.date_naive();
    let due = today.checked_add_months(Months::new(1)).unwrap_or(today);
    end_of_day(due)
}

/// `Ok(None)` means "no deadline given" (`skip`, `none`, `-` or empty).
pub fn parse_deadline(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() || matches!(value.as_str(), "skip" | "none" | "-") {
        return Ok(None);
    }
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map(|day| Some(end_of_day(day)))
        .map_err(|_| DEADLINE_ERROR.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAddPayload {
    pub title: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
}

/// Parse the argument of a one-shot `/add`.
///
/// Two shapes are accepted: `title | priority | deadline` (trailing parts
/// optional) and free text where the first `YYYY-MM-DD` and the first
/// priority token are lifted out of the title.
pub fn parse_add_payload(raw: &str) -> Result<ParsedAddPayload, String> {
    let payload = raw.trim();
    if payload.is_empty() {
        return Err(EMPTY_ADD_ERROR.to_string());
    }

    if payload.contains('|') {
        let mut parts = payload.split('|').map(str::trim);
        let title = parts.next().unwrap_or("");
        let priority_raw = parts.next().unwrap_or("");
        let deadline_raw = parts.next().unwrap_or("");
        if title.is_empty() {
            return Err(TITLE_ERROR.to_string());
        }
        let priority = if priority_raw.is_empty() {
            Priority::Medium
        } else {
            parse_priority(priority_raw).ok_or_else(|| PRIORITY_ERROR.to_string())?
        };
        let deadline = parse_deadline(deadline_raw)?;
        return Ok(ParsedAddPayload {
            title: title.to_string(),
            priority,
            deadline,
        });
    }

    let mut working = payload.to_string();

    let mut deadline = None;
    if let Some(found) = DATE_RE.captures(&working).map(|c| c[1].to_string()) {
        deadline = parse_deadline(&found)?;
        working = DATE_RE.replacen(&working, 1, "").trim().to_string();
    }

    let mut priority = Priority::Medium;
    if let Some(parsed) = PRIORITY_RE
        .captures(&working)
        .and_then(|c| parse_priority(&c[1]))
    {
        priority = parsed;
        working = PRIORITY_RE.replacen(&working, 1, "").trim().to_string();
    }

    let title = crate::utils::collapse_whitespace(&working);
    if title.is_empty() {
        return Err(TITLE_ERROR.to_string());
    }

    Ok(ParsedAddPayload {
        title,
        priority,
        deadline,
    })
}

pub fn format_deadline(deadline: Option<DateTime<Utc>>) -> String {
    deadline
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "No deadline".to_string())
}

pub fn format_day(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn task_age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0)
}

const PROJECT_TYPES: &[(&str, &[&str])] = &[
    (
        "sales",
        &["sales", "sell", "client", "lead", "prospect", "invoice", "proposal", "contract", "deal"],
    ),
    (
        "marketing",
        &["marketing", "ads", "campaign", "post", "content", "newsletter", "seo", "funnel", "outreach"],
    ),
    (
        "product",
        &["build", "ship", "feature", "bug", "deploy", "release", "prototype", "mvp", "app"],
    ),
    (
        "learning",
        &["learn", "read", "course", "study", "book", "practice", "tutorial"],
    ),
    (
        "health",
        &["gym", "run", "workout", "doctor", "sleep", "meditate", "walk"],
    ),
    (
        "admin",
        &["tax", "bank", "email", "pay", "bill", "form", "paperwork", "call", "book"],
    ),
];

/// Coarse category of a task from keywords in its title; `general` when nothing matches.
pub fn infer_project_type(title: &str) -> &'static str {
    let lowered = title.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    for (kind, keywords) in PROJECT_TYPES {
        if words
            .iter()
            .any(|w| keywords.iter().any(|k| w == k || (k.len() > 3 && w.starts_with(k))))
        {
            return kind;
        }
    }
    "general"
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use proptest::prelude::*;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_every_accepted_priority_spelling_normalizes() {
        let cases = [
            ("high", Priority::High),
            ("p1", Priority::High),
            ("1", Priority::High),
            ("URGENT", Priority::High),
            ("medium", Priority::Medium),
            ("med", Priority::Medium),
            ("P2", Priority::Medium),
            ("2", Priority::Medium),
            ("low", Priority::Low),
            ("p3", Priority::Low),
            (" 3 ", Priority::Low),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_priority(input), Some(expected), "input {input:?}");
        }
        assert_eq!(parse_priority("asap"), None);
        assert_eq!(parse_priority("4"), None);
    }

    #[test]
    fn test_skip_and_none_mean_no_deadline() {
        for raw in ["skip", "none", "NONE", "-", "", "  "] {
            assert_eq!(parse_deadline(raw), Ok(None), "input {raw:?}");
        }
    }

    #[test]
    fn test_deadline_is_end_of_day() {
        let parsed = parse_deadline("2026-03-01").unwrap().unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap());
        assert_eq!(parse_deadline("03/01/2026"), Err(DEADLINE_ERROR.to_string()));
        assert_eq!(parse_deadline("2026-02-30"), Err(DEADLINE_ERROR.to_string()));
    }

    #[test]
    fn test_default_deadline_is_one_month_later() {
        let due = default_deadline(utc(2026, 1, 15));
        assert_eq!(due.date_naive(), NaiveDate::from_ymd_opt(2026, 2, 15).unwrap());
        assert_eq!(due.format("%H:%M:%S").to_string(), "23:59:59");
    }

    #[test]
    fn test_default_deadline_clamps_short_months_and_year_end() {
        let jan31 = default_deadline(utc(2026, 1, 31));
        assert_eq!(jan31.date_naive(), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        let dec = default_deadline(utc(2025, 12, 10));
        assert_eq!((dec.year(), dec.month(), dec.day()), (2026, 1, 10));
    }

    #[test]
    fn test_pipe_payload() {
        let parsed = parse_add_payload("Call lead | high | 2026-03-01").unwrap();
        assert_eq!(parsed.title, "Call lead");
        assert_eq!(parsed.priority, Priority::High);
        assert_eq!(parsed.deadline.unwrap().date_naive().to_string(), "2026-03-01");

        let defaults = parse_add_payload("Write post |").unwrap();
        assert_eq!(defaults.priority, Priority::Medium);
        assert!(defaults.deadline.is_none());
    }

    #[test]
    fn test_pipe_payload_errors() {
        assert_eq!(parse_add_payload("| high"), Err(TITLE_ERROR.to_string()));
        assert_eq!(parse_add_payload("Task | soon"), Err(PRIORITY_ERROR.to_string()));
        assert_eq!(
            parse_add_payload("Task | low | tomorrow"),
            Err(DEADLINE_ERROR.to_string())
        );
        assert_eq!(parse_add_payload("   "), Err(EMPTY_ADD_ERROR.to_string()));
    }

    #[test]
    fn test_free_text_payload_lifts_tokens() {
        let parsed = parse_add_payload("Send proposal to ACME p1 2026-04-02").unwrap();
        assert_eq!(parsed.title, "Send proposal to ACME");
        assert_eq!(parsed.priority, Priority::High);
        assert_eq!(parsed.deadline.unwrap().date_naive().to_string(), "2026-04-02");

        let plain = parse_add_payload("Renew passport").unwrap();
        assert_eq!(plain.priority, Priority::Medium);
        assert!(plain.deadline.is_none());

        assert_eq!(parse_add_payload("high"), Err(TITLE_ERROR.to_string()));
    }

    #[test]
    fn test_infer_project_type() {
        assert_eq!(infer_project_type("Call lead about proposal"), "sales");
        assert_eq!(infer_project_type("Launch ads campaign"), "marketing");
        assert_eq!(infer_project_type("Fix login bug"), "product");
        assert_eq!(infer_project_type("Pay electricity bill"), "admin");
        assert_eq!(infer_project_type("Think about life"), "general");
    }

    #[test]
    fn test_age_never_negative() {
        let now = utc(2026, 1, 10);
        assert_eq!(task_age_days(utc(2026, 1, 1), now), 9);
        assert_eq!(task_age_days(utc(2026, 2, 1), now), 0);
    }

    proptest! {
        #[test]
        fn priority_tokens_always_normalize(
            token in prop::sample::select(vec!["high", "medium", "low", "p1", "p2", "p3", "1", "2", "3"]),
            upper in any::<bool>(),
        ) {
            let input = if upper { token.to_uppercase() } else { token.to_string() };
            let parsed = parse_priority(&input);
            prop_assert!(matches!(parsed, Some(Priority::High | Priority::Medium | Priority::Low)));
        }

        #[test]
        fn skipped_deadline_defaults_to_next_month(days in 0i64..3650) {
            let created = utc(2020, 1, 1) + chrono::Duration::days(days);
            let resolved = parse_deadline("skip").unwrap().unwrap_or_else(|| default_deadline(created));
            let expected = created.date_naive().checked_add_months(Months::new(1)).unwrap();
            prop_assert_eq!(resolved.date_naive(), expected);
        }
    }
}
