use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::EstimationError;

/// One result row from the nutrition API.
///
/// Free-tier responses replace some fields with a text notice; those parse as `None`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NutritionFacts {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein_g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbohydrates_total_g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat_total_g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub serving_size_g: Option<f64>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

#[async_trait]
pub trait NutritionApi: Send + Sync {
    async fn query(&self, term: &str) -> Result<Vec<NutritionFacts>, EstimationError>;
}

/// API Ninjas `GET /v1/nutrition?query=` client.
#[derive(Clone)]
pub struct ApiNinjasClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApiNinjasClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build nutrition api http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl NutritionApi for ApiNinjasClient {
    async fn query(&self, term: &str) -> Result<Vec<NutritionFacts>, EstimationError> {
        let response = self
            .client
            .get(format!("{}/v1/nutrition", self.base_url))
            .query(&[("query", term)])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(EstimationError::Api(format!("HTTP {}: {}", status, raw)));
        }

        let rows: Vec<NutritionFacts> =
            serde_json::from_str(&raw).map_err(|e| EstimationError::Parse(e.to_string()))?;
        debug!(term, results = rows.len(), "nutrition api answered");
        Ok(rows)
    }
}
