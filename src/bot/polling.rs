//! Long-polling transport
//!
//! Used when no public URL is configured. Each update is handled on its own
//! task so a slow photo does not hold up other chats.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::api::{TelegramClient, LONG_POLL_SECS};
use super::handlers::{handle_update, BotContext};
use super::tasks::UpdateTasks;
use super::types::Update;
use super::BotResult;

/// Pause after a failed `getUpdates` before polling again
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Offset that acknowledges `update` and everything before it
pub fn next_offset(current: i64, update: &Update) -> i64 {
    current.max(update.update_id + 1)
}

/// Poll for updates until `shutdown` resolves, then wait for running handlers
pub async fn run_polling<F>(
    telegram: TelegramClient,
    ctx: Arc<BotContext>,
    shutdown: F,
) -> BotResult<()>
where
    F: Future<Output = ()>,
{
    // getUpdates is refused while a webhook is registered
    telegram.delete_webhook().await?;
    tracing::info!("Polling for updates");

    let tasks = UpdateTasks::default();
    tokio::pin!(shutdown);

    let mut offset = 0;
    loop {
        let result = tokio::select! {
            _ = &mut shutdown => break,
            result = telegram.get_updates(offset, LONG_POLL_SECS) => result,
        };

        let updates = match result {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!("getUpdates failed: {}", e);
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(POLL_ERROR_PAUSE) => continue,
                }
            }
        };

        for update in updates {
            offset = next_offset(offset, &update);
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move {
                handle_update(&ctx, update).await;
            });
        }
    }

    tracing::info!("Waiting for {} update handler(s) to finish", tasks.len());
    tasks.drain().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: i64) -> Update {
        Update {
            update_id: id,
            message: None,
        }
    }

    #[test]
    fn test_next_offset_advances_past_update() {
        assert_eq!(next_offset(0, &update(100)), 101);
        assert_eq!(next_offset(101, &update(101)), 102);
    }

    #[test]
    fn test_next_offset_never_goes_backwards() {
        assert_eq!(next_offset(200, &update(150)), 200);
    }
}
