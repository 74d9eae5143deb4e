use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::bot::Bot;
use crate::channels::TelegramChannel;
use crate::coach::Coach;
use crate::config::AppConfig;
use crate::providers::OpenAiCompatibleProvider;
use crate::scheduler::{build_jobs, Scheduler};
use crate::state::SqliteStateStore;
use crate::traits::{Channel, ModelProvider, StateStore};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    // 1. State store
    let state: Arc<dyn StateStore> = Arc::new(SqliteStateStore::new(&config.state.db_path).await?);
    info!(path = %config.state.db_path, "State store initialized");

    // 2. Provider (optional)
    let provider: Option<Arc<dyn ModelProvider>> = if config.ai_enabled() {
        let provider =
            OpenAiCompatibleProvider::new(&config.provider.base_url, &config.provider.api_key)
                .map_err(|e| anyhow::anyhow!(e))?;
        info!(model = %config.provider.model, "Model provider configured");
        Some(Arc::new(provider))
    } else {
        warn!("OPENAI_API_KEY not set; coaching stays rule-based");
        None
    };

    // 3. Coach and chat handler
    let coach = Arc::new(Coach::new(
        state.clone(),
        provider,
        config.provider.model.clone(),
        config.coaching.stale_task_days,
    ));
    info!(ai = coach.ai_enabled(), "Coach ready");
    let handler = Arc::new(Bot::new(
        state.clone(),
        coach.clone(),
        config.telegram.allowed_chat_id,
    ));
    if let Some(chat_id) = config.telegram.allowed_chat_id {
        info!(chat_id, "Chat lock enabled");
    }

    // 4. Telegram channel
    let telegram = Arc::new(TelegramChannel::new(&config.telegram.bot_token, handler));
    if let Err(e) = telegram.register_commands().await {
        warn!(error = %e, "Failed to register bot commands");
    }

    // 5. Scheduler
    let jobs = build_jobs(&config, Utc::now())?;
    let scheduler = Arc::new(Scheduler::new(
        state,
        coach,
        telegram.clone() as Arc<dyn Channel>,
        config.telegram.allowed_chat_id,
        jobs,
        config.schedule.tick_interval_secs,
    ));
    for (kind, next_run) in scheduler.next_runs().await {
        info!(job = kind.name(), next_run = %next_run, "Scheduled job");
    }
    scheduler.spawn();

    // 6. Start Telegram with auto-retry (blocks)
    info!("Starting todo-coach v{}", env!("CARGO_PKG_VERSION"));
    telegram.start_with_retry().await;

    Ok(())
}
