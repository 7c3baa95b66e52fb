//! Nutribot
//!
//! Telegram bot that identifies food in photos and replies with nutrition
//! facts for one serving.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use nutribot::bot::{self, BotContext, TelegramClient};
use nutribot::build_info::{self, BuildInfo};
use nutribot::config::{Config, Transport};
use nutribot::db::{self, Database};
use nutribot::nutrition::ResolutionPipeline;
use nutribot::services::{ApiNinjasClient, GoogleVisionClient};

/// Open the history database, creating it and its directory if needed
fn open_history(path: &Path) -> Result<Database, Box<dyn std::error::Error>> {
    tracing::info!("Database path: {}", path.display());
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(path)?;
    database.with_conn(|conn| {
        if db::migrations::needs_migration(conn)? {
            tracing::info!("Migrating history database");
        }
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        tracing::info!("Database schema version: {}", version);
        Ok(())
    })?;

    Ok(database)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutribot=info".parse()?))
        .init();

    build_info::print_startup_banner();
    tracing::info!("Starting {}", BuildInfo::current().version_line());

    let config = Config::from_env()?;

    let history = match &config.database_path {
        Some(path) => Some(open_history(path)?),
        None => {
            tracing::info!("History disabled");
            None
        }
    };

    let serving_sizes = config.serving_sizes();
    tracing::info!("Serving-size table has {} entries", serving_sizes.len());

    let telegram = TelegramClient::new(config.telegram_token.clone())?;
    let vision_auth = config.vision_credentials.to_auth()?;
    tracing::info!("Vision auth: {:?}", vision_auth);
    let labeler = Arc::new(GoogleVisionClient::new(vision_auth)?);
    let nutrition = Arc::new(ApiNinjasClient::new(config.api_ninjas_key.clone())?);
    let pipeline = ResolutionPipeline::new(labeler, nutrition, Arc::new(serving_sizes));
    let ctx = Arc::new(BotContext::new(Arc::new(telegram.clone()), pipeline, history));

    match &config.transport {
        Transport::Webhook(webhook) => {
            bot::run_webhook(&telegram, ctx, webhook, shutdown_signal()).await?;
        }
        Transport::Polling => {
            bot::run_polling(telegram, ctx, shutdown_signal()).await?;
        }
    }

    Ok(())
}
