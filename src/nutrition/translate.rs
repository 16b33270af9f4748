use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EstimationError;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, EstimationError>;
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct TranslateErrorResponse {
    error: String,
}

/// Client for a LibreTranslate-compatible `POST /translate` endpoint.
#[derive(Clone)]
pub struct LibreTranslateClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl LibreTranslateClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build translation http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, EstimationError> {
        let body = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| EstimationError::Translate(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| EstimationError::Translate(e.to_string()))?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<TranslateErrorResponse>(&raw) {
                return Err(EstimationError::Translate(err.error));
            }
            return Err(EstimationError::Translate(format!("HTTP {}: {}", status, raw)));
        }

        let parsed: TranslateResponse =
            serde_json::from_str(&raw).map_err(|e| EstimationError::Translate(e.to_string()))?;
        let translated = parsed.translated_text.trim().to_string();
        if translated.is_empty() {
            return Err(EstimationError::Translate("empty translation".into()));
        }
        debug!(source, target, %translated, "translated food name");
        Ok(translated)
    }
}
