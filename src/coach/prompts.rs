//! Prompt text for the model and the rule-based messages used without it.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::learning::{priority_conflicts, LearningProfile};
use crate::parsing::{format_deadline, task_age_days};
use crate::traits::{Task, TaskStats};

pub const COACH_SYSTEM_PROMPT: &str = r#"You are a concise, practical accountability coach.

Ground your advice in:
1) Getting Things Done (David Allen):
- Turn vague tasks into concrete next physical actions.
- Keep projects separate from next actions.
- Review regularly.

2) The 7 Habits of Highly Effective People (Stephen Covey):
- Keep priorities tied to meaningful outcomes.
- Distinguish urgent from important.
- Ask whether the work moves the main goal forward.

3) Atomic Habits (James Clear):
- Suggest small, low-friction starts.
- Use implementation intentions ("When X, I will do Y").
- Reinforce consistency without hype.

Rules:
- Be direct and useful.
- The user's main goal is often making money; favour suggestions that raise earning potential.
- If tasks are stale, show how to split them into smaller steps.
- If priorities do not serve the main goal, say so plainly and propose a new order.
- Offer realistic money moves based on recent activity.
- Never be generic when context is available.
"#;

const TELEGRAM_FORMAT_RULES: &str = "- Formatting for Telegram:
  - plain text only
  - no markdown markers such as ###, **, __, * or backticks
  - bullets start with \"- \" and are never nested";

/// Everything the coach knows about one user at the time of a run.
pub struct CoachContext {
    pub main_goal: String,
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
    pub stale: Vec<Task>,
    pub overdue: Vec<Task>,
    pub stats: TaskStats,
    pub notes: Vec<String>,
    pub reflections: Vec<String>,
    pub profile: LearningProfile,
    pub stale_days: i64,
    pub now: DateTime<Utc>,
}

fn format_tasks(tasks: &[Task], now: DateTime<Utc>) -> String {
    if tasks.is_empty() {
        return "- (none)".to_string();
    }
    tasks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                "- [{}] {} | priority={} | type={} | deadline={} | age_days={}",
                i + 1,
                t.title,
                t.priority.label(),
                t.project_type,
                format_deadline(t.deadline),
                task_age_days(t.created_at, now)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bullet_list(items: &[String], limit: usize) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items
        .iter()
        .take(limit)
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_profile(profile: &LearningProfile) -> String {
    let mut lines = vec![
        format!("- completed_tasks_sample={}", profile.completed_tasks_sample),
        format!("- avg_completion_days={}", profile.avg_completion_display()),
        format!("- willingness_score_1_to_5={}", profile.willingness_score),
        format!("- resistance_signals={}", profile.resistance_signals),
        format!("- momentum_signals={}", profile.momentum_signals),
        format!("- top_project_types={}", profile.top_types_display()),
        format!("- best_completion_window={}", profile.best_window_display()),
        format!("- money_aligned_active_ratio={:.2}", profile.money_aligned_ratio),
        format!(
            "- conflict_flags={}",
            if profile.conflict_flags.is_empty() {
                "none".to_string()
            } else {
                profile.conflict_flags.join("; ")
            }
        ),
    ];
    if !profile.project_type_breakdown.is_empty() {
        lines.push("- project_type_breakdown:".to_string());
        lines.extend(
            profile
                .project_type_breakdown
                .iter()
                .take(6)
                .map(|l| format!("  - {}", l)),
        );
    }
    lines.join("\n")
}

pub fn build_checkin_prompt(ctx: &CoachContext, weekly: bool) -> String {
    let cadence = if weekly { "weekly review" } else { "daily check-in" };
    format!(
        r#"Time: {time}
Cadence: {cadence}
Main goal: {goal}

Stats:
- active={active}
- done_last_7_days={done_7d}
- done_last_30_days={done_30d}
- created_last_7_days={created_7d}
- created_last_30_days={created_30d}

Active todos:
{active_list}

Overdue todos:
{overdue_list}

Stale todos (age >= {stale_days} days):
{stale_list}

Recent journal notes:
{notes}

Recent reflections:
{reflections}

Execution learning profile:
{profile}

Reply with these exact section headings:
1) Today Focus
2) Split This
3) Priority Realignment
4) Money Move
5) Check-in Question
6) Process Improvement

Requirements:
- "Today Focus": at most 3 bullets.
- "Split This": pick up to 2 stale tasks and break each into concrete next actions.
- "Priority Realignment": say exactly what moves up or down given the main goal.
- "Money Move": one practical idea tied to recent tasks or notes.
- "Check-in Question": one short question asking what got done.
- "Process Improvement": 2 specific adjustments based on how this user actually executes.
{format_rules}
"#,
        time = ctx.now.format("%Y-%m-%d %H:%M UTC"),
        goal = ctx.main_goal,
        active = ctx.stats.active,
        done_7d = ctx.stats.done_7d,
        done_30d = ctx.stats.done_30d,
        created_7d = ctx.stats.created_7d,
        created_30d = ctx.stats.created_30d,
        active_list = format_tasks(&ctx.active, ctx.now),
        overdue_list = format_tasks(&ctx.overdue, ctx.now),
        stale_days = ctx.stale_days,
        stale_list = format_tasks(&ctx.stale, ctx.now),
        notes = bullet_list(&ctx.notes, 10),
        reflections = bullet_list(&ctx.reflections, 6),
        profile = format_profile(&ctx.profile),
        format_rules = TELEGRAM_FORMAT_RULES,
    )
}

pub fn build_improvement_prompt(ctx: &CoachContext) -> String {
    format!(
        r#"Time: {time}
Main goal: {goal}

Active todos:
{active_list}

Recent journal notes:
{notes}

Recent reflections:
{reflections}

Execution learning profile:
{profile}

Reply with these exact section headings:
1) How You Get Things Done
2) Time-To-Done Pattern
3) Willingness and Friction
4) Project-Type Fit
5) Conflicts
6) What To Improve
7) AI Improvements
8) Next Experiment

Requirements:
- Be concrete and diagnostic, not generic.
- "What To Improve": exactly 5 actions.
- "AI Improvements": exactly 3 ways the bot could help better.
- "Next Experiment": a 7-day experiment with simple tracking.
{format_rules}
"#,
        time = ctx.now.format("%Y-%m-%d %H:%M UTC"),
        goal = ctx.main_goal,
        active_list = format_tasks(&ctx.active, ctx.now),
        notes = bullet_list(&ctx.notes, 12),
        reflections = bullet_list(&ctx.reflections, 10),
        profile = format_profile(&ctx.profile),
        format_rules = TELEGRAM_FORMAT_RULES,
    )
}

/// Deterministic check-in used when the model is off or failing.
pub fn fallback_coaching_message(ctx: &CoachContext) -> String {
    let mut focus: Vec<String> = ctx
        .active
        .iter()
        .take(3)
        .map(|t| format!("- {} (priority: {})", t.title, t.priority.label()))
        .collect();
    if focus.is_empty() {
        focus.push("- Capture your next 1-3 actions that move your goal forward.".to_string());
    }

    let mut split: Vec<String> = ctx
        .stale
        .iter()
        .take(2)
        .map(|t| {
            format!(
                "- {} ({} days old): define the very next physical step and book a 15-minute starter block.",
                t.title,
                task_age_days(t.created_at, ctx.now)
            )
        })
        .collect();
    if split.is_empty() {
        split.push("- No stale tasks detected. Keep tasks small and executable.".to_string());
    }

    let mut realign = Vec::new();
    if !ctx.overdue.is_empty() {
        realign.push(format!(
            "- {} overdue task(s). Move the ones that serve your goal to the top today.",
            ctx.overdue.len()
        ));
    }
    let (demote, promote) = priority_conflicts(&ctx.active, &ctx.main_goal);
    for task in demote.iter().take(2) {
        realign.push(format!(
            "- \"{}\" is high priority but does not clearly serve \"{}\". Consider moving it down.",
            task.title, ctx.main_goal
        ));
    }
    for task in promote.iter().take(2) {
        realign.push(format!(
            "- \"{}\" serves \"{}\" but sits at low priority. Consider moving it up.",
            task.title, ctx.main_goal
        ));
    }
    if realign.is_empty() {
        realign.push(
            "- Keep the tasks most directly tied to your goal at high priority.".to_string(),
        );
    }

    let mut process = vec![
        format!(
            "- Average completion time: {} day(s).",
            ctx.profile.avg_completion_display()
        ),
        "- Timebox one high-value task before low-impact admin work.".to_string(),
    ];
    if let Some(flag) = ctx.profile.conflict_flags.first() {
        process.push(format!("- Resolve conflict: {}.", flag));
    }

    format!(
        "1) Today Focus\n{}\n\n2) Split This\n{}\n\n3) Priority Realignment\n{}\n\n4) Money Move\n- Pick one offer or outreach action that supports your goal: {}.\n\n5) Check-in Question\n- What did you complete since the last check-in?\n\n6) Process Improvement\n{}",
        focus.join("\n"),
        split.join("\n"),
        realign.join("\n"),
        ctx.main_goal,
        process.join("\n")
    )
}

/// Deterministic `/improve` analysis used when the model is off or failing.
pub fn fallback_improvement_message(ctx: &CoachContext) -> String {
    let profile = &ctx.profile;
    let conflicts = if profile.conflict_flags.is_empty() {
        "- too many parallel priorities".to_string()
    } else {
        profile
            .conflict_flags
            .iter()
            .take(3)
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "1) How You Get Things Done\n\
         - You execute best during: {window}.\n\
         - Your dominant project types: {types}.\n\n\
         2) Time-To-Done Pattern\n\
         - Average time to completion: {avg} day(s).\n\
         - Fast wins come from small, concrete tasks.\n\n\
         3) Willingness and Friction\n\
         - Estimated willingness score: {willingness}/5.\n\
         - Cut friction by naming one next physical action per task.\n\n\
         4) Project-Type Fit\n\
         - Keep more active tasks linked to your goal: {goal}.\n\
         - Schedule low-leverage admin after goal work.\n\n\
         5) Conflicts\n\
         {conflicts}\n\n\
         6) What To Improve\n\
         - Limit active high-priority tasks to 3.\n\
         - Timebox one 45-minute goal task first each day.\n\
         - Break any task older than {stale_days} days into 2-3 steps.\n\
         - Do a quick end-of-day review and mark completions.\n\
         - Batch low-value admin into one small block.\n\n\
         7) AI Improvements\n\
         - Ask for next actions on stale tasks.\n\
         - Ask for a weekend re-rank of tasks by goal impact.\n\
         - Ask for a daily plan inside your best work window.\n\n\
         8) Next Experiment\n\
         - For 7 days: do one goal-first block daily and report done or not done each evening.",
        window = profile.best_window_display(),
        types = profile.top_types_display(),
        avg = profile.avg_completion_display(),
        willingness = profile.willingness_score,
        goal = ctx.main_goal,
        conflicts = conflicts,
        stale_days = ctx.stale_days,
    )
}

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s*").unwrap());
static NUMBERED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*•]\s+").unwrap());

/// Flatten model output to plain chat text: no fences, headings, emphasis or
/// backticks; `1.` becomes `1)`; bullets become `- `; at most one blank line
/// in a row.
pub fn normalize_output(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut last_blank = false;

    for raw in text.replace("\r\n", "\n").split('\n') {
        let line = raw.trim();
        if line.starts_with("```") {
            continue;
        }
        let line = HEADING_RE.replace(line, "");
        let line = BULLET_RE.replace(&line, "- ").into_owned();
        let line = NUMBERED_RE
            .replace(&line, "${1}) ${2}")
            .replace("**", "")
            .replace("__", "")
            .replace(['`', '*'], "")
            .trim()
            .to_string();

        if line.is_empty() {
            if !last_blank && !lines.is_empty() {
                lines.push(String::new());
            }
            last_blank = true;
        } else {
            lines.push(line);
            last_blank = false;
        }
    }

    lines.join("\n").trim().to_string()
}
