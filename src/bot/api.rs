//! Telegram Bot API client
//!
//! Thin wrapper over the HTTPS Bot API. The bot token is part of every URL,
//! so request errors are stripped of their URL before they are returned.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::types::{ApiResponse, File, Update};
use super::{BotError, BotResult};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Seconds a `getUpdates` call may wait for new updates
pub const LONG_POLL_SECS: u64 = 30;

/// Slack on top of the long-poll wait before the HTTP request gives up
const REQUEST_TIMEOUT: Duration = Duration::from_secs(LONG_POLL_SECS + 10);

#[derive(Clone)]
pub struct TelegramClient {
    token: String,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(token: String) -> BotResult<Self> {
        Self::with_api_base(token, DEFAULT_API_BASE.to_string())
    }

    pub fn with_api_base(token: String, api_base: String) -> BotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BotError::Http(e.without_url()))?;
        Ok(Self {
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Download URL for a `File::file_path`
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    async fn call<P, T>(&self, method: &'static str, params: &P) -> BotResult<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| BotError::Http(e.without_url()))?;

        let body = response
            .text()
            .await
            .map_err(|e| BotError::Http(e.without_url()))?;
        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        unwrap_envelope(method, envelope)
    }

    /// Long-poll for updates with `update_id >= offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> BotResult<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> BotResult<()> {
        let _: serde_json::Value = self
            .call("sendMessage", &json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    pub async fn get_file(&self, file_id: &str) -> BotResult<File> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }

    /// Fetch the bytes of a file previously resolved with `get_file`
    pub async fn download_file(&self, file_path: &str) -> BotResult<Vec<u8>> {
        let response = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| BotError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Api {
                method: "download",
                code: Some(i64::from(status.as_u16())),
                description: format!("file download failed with HTTP {}", status.as_u16()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BotError::Http(e.without_url()))?;
        Ok(bytes.to_vec())
    }

    /// Resolve a photo's file id and download it
    pub async fn download_photo(&self, file_id: &str) -> BotResult<Vec<u8>> {
        let file = self.get_file(file_id).await?;
        let path = file.file_path.ok_or(BotError::MissingResult("getFile file_path"))?;
        self.download_file(&path).await
    }

    /// Register the push endpoint; Telegram echoes `secret` in a header
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> BotResult<()> {
        let mut params = json!({
            "url": url,
            "allowed_updates": ["message"],
        });
        if let Some(secret) = secret {
            params["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", &params).await?;
        Ok(())
    }

    /// Remove any registered webhook so `getUpdates` is allowed
    pub async fn delete_webhook(&self) -> BotResult<()> {
        let _: bool = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }
}

fn unwrap_envelope<T>(method: &'static str, envelope: ApiResponse<T>) -> BotResult<T> {
    if !envelope.ok {
        return Err(BotError::Api {
            method,
            code: envelope.error_code,
            description: envelope.description.unwrap_or_default(),
        });
    }
    envelope.result.ok_or(BotError::MissingResult(method))
}
