//! Configuration
//!
//! Read from the environment, after loading a `.env` file when one exists.

use std::path::PathBuf;

use thiserror::Error;

use crate::nutrition::{parse_serving_overrides, ServingSizeError, ServingSizeTable};
use crate::services::{ServiceAccountKey, ServiceResult, VisionAuth};

const DEFAULT_PORT: u16 = 8443;
const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("invalid NUTRIBOT_SERVING_SIZES: {0}")]
    ServingSizes(#[from] ServingSizeError),

    #[error(
        "no Google Vision credentials: set GOOGLE_CREDENTIALS, \
         GOOGLE_APPLICATION_CREDENTIALS or GOOGLE_VISION_API_KEY"
    )]
    MissingVisionCredentials,
}

/// Credentials for Google Cloud Vision, in order of preference
#[derive(Clone, PartialEq)]
pub enum VisionCredentials {
    /// Service-account key JSON held in `GOOGLE_CREDENTIALS`
    ServiceAccountJson(String),
    /// Service-account key file named by `GOOGLE_APPLICATION_CREDENTIALS`
    ServiceAccountFile(PathBuf),
    /// `GOOGLE_VISION_API_KEY`
    ApiKey(String),
}

impl std::fmt::Debug for VisionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisionCredentials::ServiceAccountJson(_) => f.write_str("ServiceAccountJson(..)"),
            VisionCredentials::ServiceAccountFile(path) => {
                f.debug_tuple("ServiceAccountFile").field(path).finish()
            }
            VisionCredentials::ApiKey(_) => f.write_str("ApiKey(..)"),
        }
    }
}

impl VisionCredentials {
    /// Load any key material and build the request authorization
    pub fn to_auth(&self) -> ServiceResult<VisionAuth> {
        match self {
            VisionCredentials::ServiceAccountJson(json) => {
                VisionAuth::service_account(ServiceAccountKey::from_json(json)?)
            }
            VisionCredentials::ServiceAccountFile(path) => {
                VisionAuth::service_account(ServiceAccountKey::from_file(path)?)
            }
            VisionCredentials::ApiKey(key) => Ok(VisionAuth::ApiKey(key.clone())),
        }
    }
}

/// Push transport settings
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    /// Public base URL, e.g. `https://nutribot.onrender.com`
    pub app_url: String,
    pub port: u16,
    /// Route path, always starting with `/`
    pub path: String,
    pub secret: Option<String>,
}

impl WebhookConfig {
    /// Full URL handed to `setWebhook`
    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.app_url.trim_end_matches('/'), self.path)
    }
}

/// How updates reach the bot
#[derive(Debug, Clone, PartialEq)]
pub enum Transport {
    Polling,
    Webhook(WebhookConfig),
}

#[derive(Clone)]
pub struct Config {
    pub telegram_token: String,
    pub api_ninjas_key: String,
    pub vision_credentials: VisionCredentials,
    pub transport: Transport,
    /// `None` when history is switched off
    pub database_path: Option<PathBuf>,
    pub serving_overrides: Vec<(String, f64)>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("vision_credentials", &self.vision_credentials)
            .field("transport", &self.transport)
            .field("database_path", &self.database_path)
            .field("serving_overrides", &self.serving_overrides)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load from the process environment (and `.env`)
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let transport = match get("APP_URL") {
            Some(app_url) => {
                let port = match get("PORT") {
                    Some(p) => p.trim().parse().map_err(|_| ConfigError::Invalid {
                        name: "PORT",
                        reason: format!("'{}' is not a port number", p),
                    })?,
                    None => DEFAULT_PORT,
                };
                let path = get("WEBHOOK_PATH").unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string());
                let path = if path.starts_with('/') { path } else { format!("/{}", path) };

                Transport::Webhook(WebhookConfig {
                    app_url,
                    port,
                    path,
                    secret: get("WEBHOOK_SECRET"),
                })
            }
            None => Transport::Polling,
        };

        let history_enabled = match get("NUTRIBOT_HISTORY") {
            Some(v) => !matches!(v.trim().to_lowercase().as_str(), "off" | "false" | "0" | "no"),
            None => true,
        };
        let database_path = history_enabled.then(|| {
            get("NUTRIBOT_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path)
        });

        let serving_overrides = match get("NUTRIBOT_SERVING_SIZES") {
            Some(list) => parse_serving_overrides(&list)?,
            None => Vec::new(),
        };

        let vision_credentials = if let Some(json) = get("GOOGLE_CREDENTIALS") {
            VisionCredentials::ServiceAccountJson(json)
        } else if let Some(path) = get("GOOGLE_APPLICATION_CREDENTIALS") {
            VisionCredentials::ServiceAccountFile(PathBuf::from(path))
        } else if let Some(key) = get("GOOGLE_VISION_API_KEY") {
            VisionCredentials::ApiKey(key)
        } else {
            return Err(ConfigError::MissingVisionCredentials);
        };

        Ok(Self {
            telegram_token: require("TELEGRAM_BOT_TOKEN")?,
            api_ninjas_key: require("API_NINJAS_KEY")?,
            vision_credentials,
            transport,
            database_path,
            serving_overrides,
        })
    }

    /// Built-in serving sizes plus any configured overrides
    pub fn serving_sizes(&self) -> ServingSizeTable {
        ServingSizeTable::default().with_entries(self.serving_overrides.iter().cloned())
    }
}

/// `data/nutribot.db` next to the project root (or the executable)
pub fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("nutribot.db");
    path
}
