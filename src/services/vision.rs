//! Google Cloud Vision label detection client
//!
//! Uses the REST `images:annotate` endpoint with inline base64 image
//! content. Requests carry either an API key or a service-account bearer
//! token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

use super::google_auth::{ServiceAccountAuth, ServiceAccountKey, CLOUD_PLATFORM_SCOPE};
use super::{ImageLabeler, ServiceError, ServiceResult};
use crate::models::Label;

const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_LABELS: u32 = 10;

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    description: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

/// How requests to Vision are authorized
#[derive(Clone)]
pub enum VisionAuth {
    /// `?key=` query parameter
    ApiKey(String),
    /// OAuth bearer token minted from a service-account key
    ServiceAccount(Arc<ServiceAccountAuth>),
}

impl VisionAuth {
    pub fn service_account(key: ServiceAccountKey) -> ServiceResult<Self> {
        let auth = ServiceAccountAuth::new(key, CLOUD_PLATFORM_SCOPE)?;
        Ok(Self::ServiceAccount(Arc::new(auth)))
    }
}

impl std::fmt::Debug for VisionAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisionAuth::ApiKey(_) => f.write_str("ApiKey(..)"),
            VisionAuth::ServiceAccount(auth) => {
                f.debug_tuple("ServiceAccount").field(&auth.client_email()).finish()
            }
        }
    }
}

/// Label detection over Google Cloud Vision
#[derive(Debug, Clone)]
pub struct GoogleVisionClient {
    auth: VisionAuth,
    endpoint: String,
    client: reqwest::Client,
}

impl GoogleVisionClient {
    pub fn new(auth: VisionAuth) -> ServiceResult<Self> {
        Self::with_endpoint(auth, DEFAULT_ENDPOINT.to_string())
    }

    pub fn with_endpoint(auth: VisionAuth, endpoint: String) -> ServiceResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            auth,
            endpoint,
            client,
        })
    }
}

fn build_request(image: &[u8]) -> AnnotateRequest {
    AnnotateRequest {
        requests: vec![ImageRequest {
            image: ImageContent {
                content: general_purpose::STANDARD.encode(image),
            },
            features: vec![Feature {
                kind: "LABEL_DETECTION",
                max_results: MAX_LABELS,
            }],
        }],
    }
}

/// Pull the labels out of an `images:annotate` response body
fn parse_annotate_response(body: &str) -> ServiceResult<Vec<Label>> {
    let response: AnnotateResponse = serde_json::from_str(body)?;

    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Vec::new());
    };

    if let Some(status) = first.error {
        return Err(ServiceError::Api {
            service: "Google Vision",
            message: status.message,
        });
    }

    Ok(first
        .label_annotations
        .into_iter()
        .map(|a| Label::new(a.description, a.score))
        .collect())
}

#[async_trait]
impl ImageLabeler for GoogleVisionClient {
    async fn detect_labels(&self, image: &[u8]) -> ServiceResult<Vec<Label>> {
        tracing::debug!("Sending {} byte image to Vision", image.len());

        let request = self.client.post(&self.endpoint).json(&build_request(image));
        let request = match &self.auth {
            VisionAuth::ApiKey(key) => request.query(&[("key", key.as_str())]),
            VisionAuth::ServiceAccount(auth) => request.bearer_auth(auth.access_token().await?),
        };

        // The request URL may carry the API key
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Http(e.without_url()))?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                service: "Google Vision",
                status: status.as_u16(),
                body,
            });
        }

        parse_annotate_response(&body)
    }
}
