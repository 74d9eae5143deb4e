mod bot;
mod channels;
mod chores;
mod coach;
mod config;
mod core;
mod flow;
mod parsing;
mod providers;
mod scheduler;
mod state;
mod traits;
mod types;
mod utils;

#[cfg(test)]
mod testing;

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Handle CLI arguments before touching the environment.
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--version" | "-V" => {
                println!("todo-coach {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument '{}'. Try --help.", other);
                std::process::exit(2);
            }
        }
    }

    // Load .env (or the file named by TODO_ENV_FILE) if present
    match std::env::var("TODO_ENV_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            let _ = dotenvy::from_path(path.trim());
        }
        _ => {
            let _ = dotenvy::dotenv();
        }
    }

    // Tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var("TODO_COACH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));
    let config = config::AppConfig::from_env(Some(&config_path))?;

    // Run async
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(crate::core::run(config))
}

fn print_help() {
    println!("todo-coach {}", env!("CARGO_PKG_VERSION"));
    println!("{}\n", env!("CARGO_PKG_DESCRIPTION"));
    println!("Usage: todo-coach [OPTIONS]\n");
    println!("Options:");
    println!("  -h, --help       Print help");
    println!("  -V, --version    Print version");
    println!("\nConfiguration is read from config.toml (or TODO_COACH_CONFIG),");
    println!("then overridden by environment variables:");
    println!("  TELEGRAM_BOT_TOKEN       Bot token (required)");
    println!("  ALLOWED_CHAT_ID          Only answer this chat");
    println!("  DATABASE_PATH            SQLite file (default todo_coach.db)");
    println!("  OPENAI_API_KEY           Enables model-written coaching");
    println!("  OPENAI_BASE_URL          OpenAI-compatible endpoint");
    println!("  OPENAI_MODEL             Model name (default gpt-4o-mini)");
    println!("  CHECKIN_HOUR_UTC         Daily check-in hour (default 16)");
    println!("  REFLECTION_HOUR_UTC      Daily reflection hour (default 21)");
    println!("  CHORES_MORNING_HOUR_UTC  Weekend chore reminder hour (default 8)");
    println!("  CHORES_CONFIRM_HOUR_UTC  Weekend chore confirmation hour (default 20)");
    println!("  WEEKLY_REVIEW_DAY        mon..sun (default sun)");
    println!("  WEEKLY_REVIEW_HOUR_UTC   Weekly review hour (default 17)");
    println!("  STALE_TASK_DAYS          Age that marks a task stale (default 7)");
    println!("  SCHEDULER_TICK_SECS      Scheduler wake-up interval (default 30)");
}
