//! External services
//!
//! Collaborator traits for image labeling and nutrition lookup, plus their
//! HTTP implementations (Google Cloud Vision and API Ninjas).

pub mod google_auth;
pub mod ninjas;
pub mod vision;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Label, RawNutrition};

pub use google_auth::{ServiceAccountAuth, ServiceAccountKey};
pub use ninjas::ApiNinjasClient;
pub use vision::{GoogleVisionClient, VisionAuth};

/// Errors from outbound service calls
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} error: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid Google credentials: {0}")]
    Credentials(String),

    #[error("Failed to sign token request: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Result type for service calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Turns image bytes into candidate labels
#[async_trait]
pub trait ImageLabeler: Send + Sync {
    /// Labels in the service's own order (confidence descending)
    async fn detect_labels(&self, image: &[u8]) -> ServiceResult<Vec<Label>>;
}

/// Looks up per-100 g nutrition for a food name
#[async_trait]
pub trait NutritionSource: Send + Sync {
    /// `Ok(None)` when the service has no entry for the name
    async fn fetch(&self, food_name: &str) -> ServiceResult<Option<RawNutrition>>;
}
