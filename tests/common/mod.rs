use assert_cmd::Command;

pub fn todo_coach_bin() -> Command {
    #[allow(deprecated)]
    {
        Command::cargo_bin("todo-coach").expect("todo-coach test binary should build")
    }
}

/// A command with every configuration variable cleared and no config file.
pub fn isolated_bin(dir: &std::path::Path) -> Command {
    let mut cmd = todo_coach_bin();
    cmd.current_dir(dir)
        .env("TODO_COACH_CONFIG", dir.join("missing.toml"))
        .env("TODO_ENV_FILE", dir.join("missing.env"));
    for name in [
        "TELEGRAM_BOT_TOKEN",
        "ALLOWED_CHAT_ID",
        "DATABASE_PATH",
        "OPENAI_API_KEY",
        "CHECKIN_HOUR_UTC",
        "WEEKLY_REVIEW_DAY",
    ] {
        cmd.env_remove(name);
    }
    cmd
}
