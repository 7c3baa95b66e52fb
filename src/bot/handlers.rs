//! Update handlers
//!
//! Routes incoming messages: photos go through the resolution pipeline,
//! slash commands get canned or history-backed replies. Every reply is sent
//! through a [`ChatTransport`] so the handlers run against stubs in tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::api::TelegramClient;
use super::types::{Message, PhotoSize, Update};
use super::BotResult;
use crate::db::Database;
use crate::models::{HistoryEntry, HistoryEntryCreate, HistoryStats, NutritionRecord};
use crate::nutrition::ResolutionPipeline;

/// Number of entries shown by /history
pub const HISTORY_LIMIT: i64 = 5;

pub const WELCOME_MESSAGE: &str = "👋 Welcome to the Food Nutrition Bot!\n\n\
    Send me a photo of any food item, and I'll tell you its nutritional information.\n\n\
    Just send a clear photo of a single food item, and I'll do my best to identify it \
    and provide you with detailed nutritional facts.";

pub const HELP_MESSAGE: &str = "📷 Send a photo of a single food item to get its nutrition facts.\n\n\
    Commands:\n\
    /start - Welcome message\n\
    /history - Your last 5 identified foods\n\
    /stats - How many photos you sent and how many were identified\n\
    /help - This message";

pub const NOT_IDENTIFIED_MESSAGE: &str = "Sorry, I couldn't identify the food item or get its \
    nutritional information. Please make sure the image is clear and shows a single food item.";

pub const PROCESSING_ERROR_MESSAGE: &str = "Sorry, there was an error processing your image. \
    Please try again with a different photo.";

pub const HISTORY_DISABLED_MESSAGE: &str = "History is not enabled on this bot.";

pub const HISTORY_ERROR_MESSAGE: &str = "Sorry, I couldn't load your history right now. \
    Please try again later.";

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> BotResult<()>;

    /// Download the photo identified by a platform file id
    async fn fetch_photo(&self, file_id: &str) -> BotResult<Vec<u8>>;
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> BotResult<()> {
        self.send_message(chat_id, text).await
    }

    async fn fetch_photo(&self, file_id: &str) -> BotResult<Vec<u8>> {
        self.download_photo(file_id).await
    }
}

/// A slash command addressed to the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    History,
    Stats,
    Unknown(String),
}

impl Command {
    /// Parse `/name`, `/name@BotName` or `/name args`; `None` for plain text
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name).to_lowercase();

        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "history" => Command::History,
            "stats" => Command::Stats,
            _ => Command::Unknown(name),
        })
    }
}

/// Shared state for handling updates
pub struct BotContext {
    transport: Arc<dyn ChatTransport>,
    pipeline: ResolutionPipeline,
    history: Option<Database>,
}

impl BotContext {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        pipeline: ResolutionPipeline,
        history: Option<Database>,
    ) -> Self {
        Self {
            transport,
            pipeline,
            history,
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.transport.send_text(chat_id, text).await {
            tracing::error!("Failed to send reply to chat {}: {}", chat_id, e);
        }
    }

    async fn handle_photo(&self, message: &Message, photo: &PhotoSize) {
        tracing::info!(
            "Received photo {} ({}x{}) from user {}",
            photo.file_id,
            photo.width,
            photo.height,
            message.user_id()
        );

        let reply = match self.transport.fetch_photo(&photo.file_id).await {
            Ok(image) => {
                tracing::debug!("Downloaded photo, {} bytes", image.len());
                let record = self.pipeline.identify(&image).await;
                self.record_history(message, record.as_ref()).await;
                match record {
                    Some(record) => format_record(&record),
                    None => NOT_IDENTIFIED_MESSAGE.to_string(),
                }
            }
            Err(e) => {
                tracing::error!("Failed to download photo {}: {}", photo.file_id, e);
                PROCESSING_ERROR_MESSAGE.to_string()
            }
        };

        self.reply(message.chat.id, &reply).await;
    }

    /// Append a history row; failures are logged and otherwise ignored
    async fn record_history(&self, message: &Message, record: Option<&NutritionRecord>) {
        let Some(db) = &self.history else {
            return;
        };

        let (display_name, username) = match &message.from {
            Some(user) => (user.display_name(), user.username.clone()),
            None => ("unknown".to_string(), None),
        };
        let entry = HistoryEntryCreate {
            user_id: message.user_id(),
            display_name,
            username,
            created_at: Utc::now(),
            record: record.cloned(),
        };

        if let Err(e) = db.run(move |conn| HistoryEntry::create(conn, &entry).map(|_| ())).await {
            tracing::warn!("Failed to store history for user {}: {}", message.user_id(), e);
        }
    }

    /// Reply text for a command sent by `user_id`
    pub async fn command_reply(&self, command: &Command, user_id: i64) -> String {
        match command {
            Command::Start => WELCOME_MESSAGE.to_string(),
            Command::Help => HELP_MESSAGE.to_string(),
            Command::History => {
                let Some(db) = &self.history else {
                    return HISTORY_DISABLED_MESSAGE.to_string();
                };
                match db
                    .run(move |conn| HistoryEntry::recent_successful(conn, user_id, HISTORY_LIMIT))
                    .await
                {
                    Ok(entries) => format_history(&entries),
                    Err(e) => {
                        tracing::error!("Failed to load history for user {}: {}", user_id, e);
                        HISTORY_ERROR_MESSAGE.to_string()
                    }
                }
            }
            Command::Stats => {
                let Some(db) = &self.history else {
                    return HISTORY_DISABLED_MESSAGE.to_string();
                };
                match db.run(move |conn| HistoryEntry::stats(conn, user_id)).await {
                    Ok(stats) => format_stats(&stats),
                    Err(e) => {
                        tracing::error!("Failed to load stats for user {}: {}", user_id, e);
                        HISTORY_ERROR_MESSAGE.to_string()
                    }
                }
            }
            Command::Unknown(name) => {
                format!("Unknown command /{}. Send /help to see what I can do.", name)
            }
        }
    }
}

/// Dispatch one update to the matching handler
pub async fn handle_update(ctx: &BotContext, update: Update) {
    let Some(message) = update.message else {
        tracing::debug!("Ignoring update {} without a message", update.update_id);
        return;
    };

    if let Some(photo) = message.largest_photo() {
        ctx.handle_photo(&message, photo).await;
        return;
    }

    match message.text.as_deref().and_then(Command::parse) {
        Some(command) => {
            tracing::info!("Command {:?} from user {}", command, message.user_id());
            let reply = ctx.command_reply(&command, message.user_id()).await;
            ctx.reply(message.chat.id, &reply).await;
        }
        None => tracing::debug!("Ignoring non-command message {}", message.message_id),
    }
}

/// Title case: upper after any non-letter, lower elsewhere
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Success reply for an identified food
pub fn format_record(record: &NutritionRecord) -> String {
    format!(
        "🍽 Identified Food: {}\n\
         ⚖️ Serving Size: {}g\n\
         \n📊 Nutritional Information:\n\
         ━━━━━━━━━━━━━━━━━━━━━\n\
         • Fat: {:.1}g\n\
         • Carbohydrates: {:.1}g\n\
         \u{20}    ├ Fiber: {:.1}g\n\
         \u{20}    └ Sugar: {:.1}g\n\
         \n🧂 Minerals:\n\
         ━━━━━━━━━━━━━━━━━━━━━\n\
         • Sodium: {}mg\n\
         • Potassium: {}mg\n\
         • Cholesterol: {}mg",
        title_case(&record.food),
        record.serving_size,
        record.fat,
        record.carbs,
        record.fiber,
        record.sugar,
        record.sodium,
        record.potassium,
        record.cholesterol,
    )
}

/// Reply for /history
pub fn format_history(entries: &[HistoryEntry]) -> String {
    let lines: Vec<String> = entries
        .iter()
        .filter_map(|entry| entry.record.as_ref().map(|r| (entry, r)))
        .enumerate()
        .map(|(i, (entry, r))| {
            let date = entry.created_at.get(..10).unwrap_or(entry.created_at.as_str());
            format!(
                "{}. {} ({}g) on {}\n   Fat {:.1}g · Carbs {:.1}g · Sodium {}mg",
                i + 1,
                title_case(&r.food),
                r.serving_size,
                date,
                r.fat,
                r.carbs,
                r.sodium
            )
        })
        .collect();

    if lines.is_empty() {
        return "You have no identified foods yet. Send me a food photo to get started!"
            .to_string();
    }

    format!("🗂 Your recent foods:\n\n{}", lines.join("\n"))
}

/// Reply for /stats
pub fn format_stats(stats: &HistoryStats) -> String {
    format!(
        "📈 Your stats:\n\
         • Photos sent: {}\n\
         • Foods identified: {}\n\
         • Success rate: {:.1}%",
        stats.total,
        stats.successful,
        stats.success_rate()
    )
}
