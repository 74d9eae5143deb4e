use std::path::Path;

use anyhow::Context;
use chrono::Weekday;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub coaching: CoachingConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// When set, every other chat is refused.
    #[serde(default)]
    pub allowed_chat_id: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "todo_coach.db".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Empty disables model calls; coaching stays rule-based.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// All hours are UTC.
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_checkin_hour")]
    pub checkin_hour: u32,
    #[serde(default = "default_reflection_hour")]
    pub reflection_hour: u32,
    #[serde(default = "default_chores_morning_hour")]
    pub chores_morning_hour: u32,
    #[serde(default = "default_chores_confirm_hour")]
    pub chores_confirm_hour: u32,
    #[serde(default = "default_weekly_review_day")]
    pub weekly_review_day: String,
    #[serde(default = "default_weekly_review_hour")]
    pub weekly_review_hour: u32,
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            checkin_hour: default_checkin_hour(),
            reflection_hour: default_reflection_hour(),
            chores_morning_hour: default_chores_morning_hour(),
            chores_confirm_hour: default_chores_confirm_hour(),
            weekly_review_day: default_weekly_review_day(),
            weekly_review_hour: default_weekly_review_hour(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

fn default_checkin_hour() -> u32 {
    16
}
fn default_reflection_hour() -> u32 {
    21
}
fn default_chores_morning_hour() -> u32 {
    8
}
fn default_chores_confirm_hour() -> u32 {
    20
}
fn default_weekly_review_day() -> String {
    "sun".to_string()
}
fn default_weekly_review_hour() -> u32 {
    17
}
fn default_tick_interval_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoachingConfig {
    #[serde(default = "default_stale_task_days")]
    pub stale_task_days: i64,
}

impl Default for CoachingConfig {
    fn default() -> Self {
        Self {
            stale_task_days: default_stale_task_days(),
        }
    }
}

fn default_stale_task_days() -> i64 {
    7
}

/// Accepts three-letter and full English day names, case-insensitive.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw.trim().to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
) -> anyhow::Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        _ => Ok(None),
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Optional TOML file first, then environment overrides, then validation.
    pub fn resolve(
        path: Option<&Path>,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => Self::load(p)?,
            _ => AppConfig::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve from the process environment.
    pub fn from_env(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::resolve(path, &|name: &str| std::env::var(name).ok())
    }

    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(raw) = lookup("ALLOWED_CHAT_ID") {
            self.telegram.allowed_chat_id = if raw.trim().is_empty() {
                None
            } else {
                Some(raw.trim().parse::<i64>().map_err(|e| {
                    anyhow::anyhow!("ALLOWED_CHAT_ID has an invalid value '{}': {}", raw, e)
                })?)
            };
        }
        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.trim().is_empty()) {
            self.state.db_path = path.trim().to_string();
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.provider.api_key = key.trim().to_string();
        }
        if let Some(url) = lookup("OPENAI_BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.provider.base_url = url.trim().to_string();
        }
        if let Some(model) = lookup("OPENAI_MODEL").filter(|m| !m.trim().is_empty()) {
            self.provider.model = model.trim().to_string();
        }

        let schedule = &mut self.schedule;
        if let Some(h) = env_parse(lookup, "CHECKIN_HOUR_UTC")? {
            schedule.checkin_hour = h;
        }
        if let Some(h) = env_parse(lookup, "REFLECTION_HOUR_UTC")? {
            schedule.reflection_hour = h;
        }
        if let Some(h) = env_parse(lookup, "CHORES_MORNING_HOUR_UTC")? {
            schedule.chores_morning_hour = h;
        }
        if let Some(h) = env_parse(lookup, "CHORES_CONFIRM_HOUR_UTC")? {
            schedule.chores_confirm_hour = h;
        }
        if let Some(day) = lookup("WEEKLY_REVIEW_DAY").filter(|d| !d.trim().is_empty()) {
            schedule.weekly_review_day = day.trim().to_string();
        }
        if let Some(h) = env_parse(lookup, "WEEKLY_REVIEW_HOUR_UTC")? {
            schedule.weekly_review_hour = h;
        }
        if let Some(secs) = env_parse(lookup, "SCHEDULER_TICK_SECS")? {
            schedule.tick_interval_secs = secs;
        }
        if let Some(days) = env_parse(lookup, "STALE_TASK_DAYS")? {
            self.coaching.stale_task_days = days;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!("TELEGRAM_BOT_TOKEN is required");
        }
        let hours = [
            ("CHECKIN_HOUR_UTC", self.schedule.checkin_hour),
            ("REFLECTION_HOUR_UTC", self.schedule.reflection_hour),
            ("CHORES_MORNING_HOUR_UTC", self.schedule.chores_morning_hour),
            ("CHORES_CONFIRM_HOUR_UTC", self.schedule.chores_confirm_hour),
            ("WEEKLY_REVIEW_HOUR_UTC", self.schedule.weekly_review_hour),
        ];
        for (name, hour) in hours {
            if hour > 23 {
                anyhow::bail!("{} must be between 0 and 23, got {}", name, hour);
            }
        }
        if parse_weekday(&self.schedule.weekly_review_day).is_none() {
            anyhow::bail!(
                "WEEKLY_REVIEW_DAY must be a day name like 'sun', got '{}'",
                self.schedule.weekly_review_day
            );
        }
        if !(1..=365).contains(&self.coaching.stale_task_days) {
            anyhow::bail!(
                "STALE_TASK_DAYS must be between 1 and 365, got {}",
                self.coaching.stale_task_days
            );
        }
        if self.schedule.tick_interval_secs == 0 {
            anyhow::bail!("SCHEDULER_TICK_SECS must be at least 1");
        }
        Ok(())
    }

    /// Weekly review day; validated at load time, Sunday otherwise.
    pub fn weekly_review_weekday(&self) -> Weekday {
        parse_weekday(&self.schedule.weekly_review_day).unwrap_or(Weekday::Sun)
    }

    pub fn ai_enabled(&self) -> bool {
        !self.provider.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_with_only_token() {
        let config = AppConfig::resolve(None, &lookup_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")]))
            .unwrap();
        assert_eq!(config.state.db_path, "todo_coach.db");
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.schedule.checkin_hour, 16);
        assert_eq!(config.schedule.reflection_hour, 21);
        assert_eq!(config.weekly_review_weekday(), Weekday::Sun);
        assert_eq!(config.coaching.stale_task_days, 7);
        assert_eq!(config.telegram.allowed_chat_id, None);
        assert!(!config.ai_enabled());
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let err = AppConfig::resolve(None, &lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::resolve(
            None,
            &lookup_from(&[
                ("TELEGRAM_BOT_TOKEN", "t"),
                ("ALLOWED_CHAT_ID", "-100200"),
                ("OPENAI_API_KEY", "sk-test"),
                ("CHECKIN_HOUR_UTC", "7"),
                ("WEEKLY_REVIEW_DAY", "Friday"),
                ("STALE_TASK_DAYS", "14"),
            ]),
        )
        .unwrap();
        assert_eq!(config.telegram.allowed_chat_id, Some(-100200));
        assert!(config.ai_enabled());
        assert_eq!(config.schedule.checkin_hour, 7);
        assert_eq!(config.weekly_review_weekday(), Weekday::Fri);
        assert_eq!(config.coaching.stale_task_days, 14);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let cases = [
            ("CHECKIN_HOUR_UTC", "24"),
            ("CHECKIN_HOUR_UTC", "noon"),
            ("STALE_TASK_DAYS", "0"),
            ("WEEKLY_REVIEW_DAY", "someday"),
            ("ALLOWED_CHAT_ID", "me"),
        ];
        for (name, value) in cases {
            let err = AppConfig::resolve(
                None,
                &lookup_from(&[("TELEGRAM_BOT_TOKEN", "t"), (name, value)]),
            )
            .unwrap_err();
            assert!(err.to_string().contains(name), "{name}={value}: {err}");
        }
    }

    #[test]
    fn test_toml_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[telegram]
bot_token = "from-file"
allowed_chat_id = 42

[schedule]
checkin_hour = 9

[coaching]
stale_task_days = 3
"#
        )
        .unwrap();

        let config = AppConfig::resolve(
            Some(file.path()),
            &lookup_from(&[("CHECKIN_HOUR_UTC", "10")]),
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token, "from-file");
        assert_eq!(config.telegram.allowed_chat_id, Some(42));
        assert_eq!(config.schedule.checkin_hour, 10);
        assert_eq!(config.schedule.reflection_hour, 21);
        assert_eq!(config.coaching.stale_task_days, 3);
    }
}
