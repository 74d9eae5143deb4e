//! Execution profile derived from a user's task history and notes.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::traits::Task;
use crate::types::Priority;

const MOMENTUM_WORDS: &[&str] = &[
    "done", "completed", "finished", "shipped", "sent", "called", "closed", "progress", "focused",
    "win",
];

const RESISTANCE_WORDS: &[&str] = &[
    "stuck",
    "avoid",
    "procrast",
    "later",
    "tired",
    "blocked",
    "overwhelmed",
    "distracted",
    "hard",
    "cannot",
    "can't",
];

const MONEY_KEYWORDS: &[&str] = &[
    "sales", "sell", "client", "lead", "prospect", "revenue", "invoice", "pricing", "offer",
    "proposal", "outreach", "contract", "funnel", "ads", "campaign", "market",
];

const MONEY_GOAL_WORDS: &[&str] = &[
    "money", "income", "revenue", "earn", "profit", "sales", "cash", "rich",
];

const MONEY_PROJECT_TYPES: &[&str] = &["sales", "marketing", "product"];

/// Inclusive UTC hour ranges for completion windows.
const WINDOWS: &[(&str, u32, u32)] = &[
    ("early_morning", 5, 8),
    ("morning", 9, 11),
    ("afternoon", 12, 16),
    ("evening", 17, 21),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningProfile {
    pub completed_tasks_sample: usize,
    pub avg_completion_days: Option<f64>,
    pub best_completion_window: Option<&'static str>,
    pub top_project_types: Vec<String>,
    /// `"<type>: count=N, avg_days=X.Y"`, most frequent type first.
    pub project_type_breakdown: Vec<String>,
    /// 1..=5
    pub willingness_score: i64,
    pub momentum_signals: usize,
    pub resistance_signals: usize,
    pub money_aligned_ratio: f64,
    pub conflict_flags: Vec<String>,
}

impl LearningProfile {
    pub fn avg_completion_display(&self) -> String {
        self.avg_completion_days
            .map(|d| format!("{:.1}", d))
            .unwrap_or_else(|| "n/a".to_string())
    }

    pub fn best_window_display(&self) -> &'static str {
        self.best_completion_window.unwrap_or("n/a")
    }

    pub fn top_types_display(&self) -> String {
        if self.top_project_types.is_empty() {
            "n/a".to_string()
        } else {
            self.top_project_types.join(", ")
        }
    }
}

pub struct ProfileInput<'a> {
    pub active: &'a [Task],
    pub completed: &'a [Task],
    pub stale: &'a [Task],
    pub overdue: &'a [Task],
    pub notes: &'a [String],
    pub reflections: &'a [String],
    pub now: DateTime<Utc>,
}

pub fn build_learning_profile(input: &ProfileInput<'_>) -> LearningProfile {
    let mut durations = Vec::new();
    let mut by_type: HashMap<String, Vec<f64>> = HashMap::new();
    let mut window_counts = [0usize; 4];

    for task in input.completed {
        let Some(completed_at) = task.completed_at else {
            continue;
        };
        let days = ((completed_at - task.created_at).num_seconds() as f64 / 86_400.0).max(0.0);
        durations.push(days);
        by_type
            .entry(task.project_type.clone())
            .or_default()
            .push(days);

        let hour = completed_at.hour();
        if let Some(idx) = WINDOWS
            .iter()
            .position(|(_, start, end)| (*start..=*end).contains(&hour))
        {
            window_counts[idx] += 1;
        }
    }

    let best_completion_window = window_counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        // First window wins ties.
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
        .map(|(idx, _)| WINDOWS[idx].0);

    let mut types: Vec<(String, Vec<f64>)> = by_type.into_iter().collect();
    types.sort_by(|(na, a), (nb, b)| b.len().cmp(&a.len()).then(na.cmp(nb)));
    let top_project_types = types.iter().take(3).map(|(name, _)| name.clone()).collect();
    let project_type_breakdown = types
        .iter()
        .map(|(name, values)| {
            format!(
                "{}: count={}, avg_days={:.1}",
                name,
                values.len(),
                mean(values)
            )
        })
        .collect();

    let signals: Vec<&String> = input.notes.iter().chain(input.reflections).collect();
    let (momentum_signals, resistance_signals, willingness_score) = estimate_willingness(&signals);

    LearningProfile {
        completed_tasks_sample: input.completed.len(),
        avg_completion_days: (!durations.is_empty()).then(|| round1(mean(&durations))),
        best_completion_window,
        top_project_types,
        project_type_breakdown,
        willingness_score,
        momentum_signals,
        resistance_signals,
        money_aligned_ratio: money_aligned_ratio(input.active),
        conflict_flags: conflict_flags(input),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn conflict_flags(input: &ProfileInput<'_>) -> Vec<String> {
    let high = |tasks: &[Task]| tasks.iter().filter(|t| t.priority == Priority::High).count();
    let active_high = high(input.active);
    let overdue_high = high(input.overdue);
    let stale_high = high(input.stale);

    let mut flags = Vec::new();
    if active_high > 4 {
        flags.push(format!(
            "too many high-priority tasks in parallel ({})",
            active_high
        ));
    }
    if overdue_high > 0 {
        flags.push(format!("overdue high-priority tasks ({})", overdue_high));
    }
    if stale_high >= 2 {
        flags.push(format!("stale high-priority tasks ({})", stale_high));
    }
    let horizon = input.now + Duration::days(7);
    let due_soon = input
        .active
        .iter()
        .filter_map(|t| t.deadline)
        .filter(|d| *d >= input.now && *d <= horizon)
        .count();
    if due_soon >= 5 {
        flags.push(format!("deadline cluster in next 7 days ({} tasks)", due_soon));
    }
    flags
}

/// Counts momentum and resistance words (each word at most once per note) and
/// maps the balance onto a 1..=5 score centred on 3.
pub fn estimate_willingness(notes: &[&String]) -> (usize, usize, i64) {
    let mut momentum = 0;
    let mut resistance = 0;
    for note in notes {
        let text = note.to_lowercase();
        momentum += MOMENTUM_WORDS.iter().filter(|w| text.contains(*w)).count();
        resistance += RESISTANCE_WORDS.iter().filter(|w| text.contains(*w)).count();
    }
    let raw = 3.0 + (momentum as f64 - resistance as f64) * 0.2;
    let score = (raw.round() as i64).clamp(1, 5);
    (momentum, resistance, score)
}

fn is_money_task(task: &Task) -> bool {
    let title = task.title.to_lowercase();
    MONEY_KEYWORDS.iter().any(|k| title.contains(k))
        || MONEY_PROJECT_TYPES.contains(&task.project_type.as_str())
}

pub fn money_aligned_ratio(active: &[Task]) -> f64 {
    if active.is_empty() {
        return 0.0;
    }
    let aligned = active.iter().filter(|t| is_money_task(t)).count();
    round2(aligned as f64 / active.len() as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whether a task plausibly moves `main_goal` forward: it shares a
/// significant word with the goal, or the goal is about money and the task is
/// revenue work.
pub fn is_goal_aligned(task: &Task, main_goal: &str) -> bool {
    let goal = main_goal.to_lowercase();
    let title = task.title.to_lowercase();
    let shares_word = goal
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .any(|w| title.contains(w));
    let money_goal = MONEY_GOAL_WORDS.iter().any(|w| goal.contains(w));
    shares_word || (money_goal && is_money_task(task))
}

/// Tasks whose priority disagrees with the goal: high-priority work that does
/// not serve it, and goal work parked at low priority.
pub fn priority_conflicts<'a>(active: &'a [Task], main_goal: &str) -> (Vec<&'a Task>, Vec<&'a Task>) {
    let demote = active
        .iter()
        .filter(|t| t.priority == Priority::High && !is_goal_aligned(t, main_goal))
        .collect();
    let promote = active
        .iter()
        .filter(|t| t.priority == Priority::Low && is_goal_aligned(t, main_goal))
        .collect();
    (demote, promote)
}
