//! Webhook transport
//!
//! Used when a public URL is configured. Telegram POSTs each update to the
//! webhook path; the update is acknowledged immediately and handled on a
//! background task. Shutdown stops accepting requests, then waits for those
//! tasks.

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;

use super::api::TelegramClient;
use super::handlers::{handle_update, BotContext};
use super::tasks::UpdateTasks;
use super::types::Update;
use super::BotResult;
use crate::config::WebhookConfig;

/// Header Telegram uses to echo the secret given to `setWebhook`
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
struct WebhookState {
    ctx: Arc<BotContext>,
    secret: Option<Arc<str>>,
    tasks: Arc<UpdateTasks>,
}

/// True when no secret is configured or the provided one matches
pub fn secret_matches(expected: Option<&str>, provided: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => provided == Some(expected),
    }
}

/// Router serving `POST {path}`; handlers are tracked in `tasks`
pub fn router(
    ctx: Arc<BotContext>,
    path: &str,
    secret: Option<String>,
    tasks: Arc<UpdateTasks>,
) -> Router {
    let state = WebhookState {
        ctx,
        secret: secret.map(Arc::from),
        tasks,
    };

    Router::new()
        .route(path, post(receive_update))
        .with_state(state)
}

async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !secret_matches(state.secret.as_deref(), provided) {
        tracing::warn!("Rejected webhook call with missing or wrong secret");
        return StatusCode::UNAUTHORIZED;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!("Malformed webhook update: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let ctx = Arc::clone(&state.ctx);
    state.tasks.spawn(async move {
        handle_update(&ctx, update).await;
    });

    StatusCode::OK
}

/// Register the webhook and serve it until `shutdown` resolves
pub async fn run_webhook<F>(
    telegram: &TelegramClient,
    ctx: Arc<BotContext>,
    config: &WebhookConfig,
    shutdown: F,
) -> BotResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let url = config.webhook_url();
    telegram.set_webhook(&url, config.secret.as_deref()).await?;
    tracing::info!("Webhook registered at {}", url);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Listening on 0.0.0.0:{}{}", config.port, config.path);

    let tasks = Arc::new(UpdateTasks::default());
    let app = router(ctx, &config.path, config.secret.clone(), Arc::clone(&tasks));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Waiting for {} update handler(s) to finish", tasks.len());
    tasks.drain().await;
    Ok(())
}
