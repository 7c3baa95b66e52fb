//! API Ninjas nutrition client

use std::time::Duration;

use async_trait::async_trait;

use super::{NutritionSource, ServiceError, ServiceResult};
use crate::models::RawNutrition;

const DEFAULT_BASE_URL: &str = "https://api.api-ninjas.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for `GET /v1/nutrition?query=<food>`
#[derive(Debug, Clone)]
pub struct ApiNinjasClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl ApiNinjasClient {
    pub fn new(api_key: String) -> ServiceResult<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> ServiceResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Every item the service matched for `query`, per 100 g
    pub async fn query(&self, query: &str) -> ServiceResult<Vec<RawNutrition>> {
        let url = format!("{}/nutrition", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("API Ninjas '{}' -> HTTP {}", query, status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                service: "API Ninjas",
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_nutrition_response(&body)
    }
}

/// Decode the JSON array the nutrition endpoint returns
pub fn parse_nutrition_response(body: &str) -> ServiceResult<Vec<RawNutrition>> {
    Ok(serde_json::from_str(body)?)
}

/// The entry used for a query: the first one the service lists
pub fn best_match(items: Vec<RawNutrition>) -> Option<RawNutrition> {
    items.into_iter().next()
}

#[async_trait]
impl NutritionSource for ApiNinjasClient {
    async fn fetch(&self, food_name: &str) -> ServiceResult<Option<RawNutrition>> {
        match self.query(food_name).await {
            Ok(items) => Ok(best_match(items)),
            // A rejected query means "no data", same as an empty result
            Err(ServiceError::Status { status, body, .. }) => {
                tracing::warn!(
                    "API Ninjas rejected '{}' with HTTP {}: {}",
                    food_name,
                    status,
                    body
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
