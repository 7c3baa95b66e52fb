//! Telegram bot
//!
//! Bot API client, update handling and the two transports (long polling and
//! webhook) that feed updates into the handlers.

pub mod api;
pub mod handlers;
pub mod polling;
pub mod tasks;
pub mod types;
pub mod webhook;

use thiserror::Error;

pub use api::TelegramClient;
pub use handlers::{handle_update, BotContext, Command};
pub use polling::run_polling;
pub use tasks::UpdateTasks;
pub use webhook::run_webhook;

/// Bot API and transport errors
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram {method} failed ({code:?}): {description}")]
    Api {
        method: &'static str,
        code: Option<i64>,
        description: String,
    },

    #[error("Telegram {0} returned no result")]
    MissingResult(&'static str),

    #[error("Failed to decode Telegram response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Webhook server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bot operations
pub type BotResult<T> = Result<T, BotError>;
