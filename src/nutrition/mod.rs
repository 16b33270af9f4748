//! Nutrition estimation for free-text food items.
//!
//! One [`NutritionEstimator`] is chosen at startup from configuration:
//! - [`table::StaticTableEstimator`]: curated in-process lookup
//! - [`translated::TranslatedLookupEstimator`]: translate, then query a nutrition API
//! - [`generative::GenerativeEstimator`]: ask a generative text model for a JSON estimate
//!
//! Estimators return `Result`; callers go through [`estimate_or_fallback`] so a
//! failed lookup always degrades to the estimator's fallback numbers.

pub mod genai;
pub mod generative;
pub mod ninjas;
pub mod table;
pub mod translate;
pub mod translated;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AppConfig, EstimatorKind};

/// Source label stored on items whose numbers came from a fallback.
pub const FALLBACK_SOURCE: &str = "fallback";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub weight_grams: Option<f64>,
}

impl NutritionEstimate {
    pub const fn new(calories: f64, protein_g: f64, carbs_g: f64, fat_g: f64, weight_grams: Option<f64>) -> Self {
        Self {
            calories,
            protein_g,
            carbs_g,
            fat_g,
            weight_grams,
        }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, None)
    }

    /// Clamps NaN, infinite and negative values to zero.
    pub fn sanitized(self) -> Self {
        fn clamp(v: f64) -> f64 {
            if v.is_finite() && v > 0.0 {
                v
            } else {
                0.0
            }
        }
        Self {
            calories: clamp(self.calories),
            protein_g: clamp(self.protein_g),
            carbs_g: clamp(self.carbs_g),
            fat_g: clamp(self.fat_g),
            weight_grams: self.weight_grams.map(clamp),
        }
    }
}

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("translation failed: {0}")]
    Translate(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("no nutrition data for {0:?}")]
    NotFound(String),
}

impl From<reqwest::Error> for EstimationError {
    fn from(e: reqwest::Error) -> Self {
        EstimationError::Request(e.to_string())
    }
}

#[async_trait]
pub trait NutritionEstimator: Send + Sync {
    /// Label stored on items this estimator produced.
    fn source(&self) -> &'static str;

    async fn estimate(&self, food: &str) -> Result<NutritionEstimate, EstimationError>;

    /// Numbers used when `estimate` fails.
    fn fallback(&self) -> NutritionEstimate;
}

/// Resolved numbers for one item and where they came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub estimate: NutritionEstimate,
    pub source: &'static str,
}

/// Runs the estimator and substitutes its fallback on any error. Never fails.
pub async fn estimate_or_fallback(estimator: &dyn NutritionEstimator, food: &str) -> Resolved {
    match estimator.estimate(food).await {
        Ok(estimate) => Resolved {
            estimate: estimate.sanitized(),
            source: estimator.source(),
        },
        Err(e) => {
            warn!(error = %e, food, estimator = estimator.source(), "estimation failed; using fallback");
            Resolved {
                estimate: estimator.fallback().sanitized(),
                source: FALLBACK_SOURCE,
            }
        }
    }
}

/// Builds the configured estimator with its HTTP collaborators.
pub fn from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn NutritionEstimator>> {
    let estimator: Arc<dyn NutritionEstimator> = match config.estimator {
        EstimatorKind::Static => Arc::new(table::StaticTableEstimator::new()),
        EstimatorKind::Api => {
            let api = &config.nutrition_api;
            let timeout = Duration::from_secs(api.timeout_secs);
            let translator = translate::LibreTranslateClient::new(
                &config.translate.url,
                config.translate.api_key.clone(),
                timeout,
            )?;
            let key = api
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("NUTRITION_API_KEY is not set"))?;
            let lookup = ninjas::ApiNinjasClient::new(&api.url, key, timeout)?;
            Arc::new(translated::TranslatedLookupEstimator::new(
                Arc::new(translator),
                Arc::new(lookup),
                &config.translate.source_lang,
                &config.translate.target_lang,
            ))
        }
        EstimatorKind::Ai => {
            let g = &config.genai;
            let key = g
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("GENAI_API_KEY is not set"))?;
            let client = genai::GeminiClient::new(&g.url, &g.model, key, Duration::from_secs(g.timeout_secs))?;
            Arc::new(generative::GenerativeEstimator::new(Arc::new(client)))
        }
    };
    info!(estimator = estimator.source(), "nutrition estimator ready");
    Ok(estimator)
}

/// Reads a number from a JSON value that may be a number or text like `"250 kcal"`.
///
/// A comma followed by exactly three digits groups thousands (`"1,200"`);
/// any other comma is a decimal mark (`"3,5"`).
pub(crate) fn number_from_value(v: &serde_json::Value) -> Option<f64> {
    lazy_static! {
        static ref NUMBER_RE: Regex =
            Regex::new(r"-?(?:\d{1,3}(?:,\d{3})+(?:\.\d+)?\b|\d+(?:[.,]\d+)?)").unwrap();
    }
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => NUMBER_RE.find(s).and_then(|m| {
            let text = m.as_str();
            let normalized = if text.contains('.') || is_grouped(text) {
                text.replace(',', "")
            } else {
                text.replace(',', ".")
            };
            normalized.parse::<f64>().ok()
        }),
        _ => None,
    }
}

fn is_grouped(text: &str) -> bool {
    text.contains(',') && text.split(',').skip(1).all(|group| group.len() == 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NutritionEstimator for Flaky {
        fn source(&self) -> &'static str {
            "flaky"
        }
        async fn estimate(&self, food: &str) -> Result<NutritionEstimate, EstimationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if food == "boom" {
                return Err(EstimationError::Api("down".into()));
            }
            Ok(NutritionEstimate::new(-5.0, f64::NAN, 12.0, 3.0, Some(f64::INFINITY)))
        }
        fn fallback(&self) -> NutritionEstimate {
            NutritionEstimate::new(1.0, 1.0, 1.0, 1.0, None)
        }
    }

    #[tokio::test]
    async fn fallback_replaces_errors_and_values_are_sanitized() {
        let est = Flaky {
            calls: AtomicUsize::new(0),
        };

        let ok = estimate_or_fallback(&est, "apple").await;
        assert_eq!(ok.source, "flaky");
        assert_eq!(ok.estimate, NutritionEstimate::new(0.0, 0.0, 12.0, 3.0, Some(0.0)));

        let failed = estimate_or_fallback(&est, "boom").await;
        assert_eq!(failed.source, FALLBACK_SOURCE);
        assert_eq!(failed.estimate.calories, 1.0);
        assert_eq!(est.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn number_from_value_accepts_numbers_and_text() {
        assert_eq!(number_from_value(&json!(250)), Some(250.0));
        assert_eq!(number_from_value(&json!(12.5)), Some(12.5));
        assert_eq!(number_from_value(&json!("250 kcal")), Some(250.0));
        assert_eq!(number_from_value(&json!("~3,5 g")), Some(3.5));
        assert_eq!(number_from_value(&json!("-2 g")), Some(-2.0));
        assert_eq!(number_from_value(&json!("Only available for premium subscribers.")), None);
        assert_eq!(number_from_value(&json!(null)), None);
    }

    #[test]
    fn comma_before_three_digits_groups_thousands() {
        assert_eq!(number_from_value(&json!("1,200 kcal")), Some(1200.0));
        assert_eq!(number_from_value(&json!("1,000")), Some(1000.0));
        assert_eq!(number_from_value(&json!("about 12,500,000")), Some(12_500_000.0));
        assert_eq!(number_from_value(&json!("1,234.5 g")), Some(1234.5));
        assert_eq!(number_from_value(&json!("0,25")), Some(0.25));
        assert_eq!(number_from_value(&json!("12,3456")), Some(12.3456));
    }

    #[test]
    fn static_config_builds_table_estimator() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        let est = from_config(&cfg).unwrap();
        assert_eq!(est.source(), table::SOURCE);
    }

    fn config_with(pairs: &[(&str, &str)]) -> AppConfig {
        let map: std::collections::HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned()).unwrap()
    }

    #[test]
    fn api_config_builds_translated_lookup_estimator() {
        let cfg = config_with(&[
            ("NUTRITION_ESTIMATOR", "api"),
            ("NUTRITION_API_KEY", "ninja-key"),
            ("TRANSLATE_API_URL", "http://127.0.0.1:9/"),
        ]);
        let est = from_config(&cfg).unwrap();
        assert_eq!(est.source(), translated::SOURCE);
        assert_eq!(est.fallback(), NutritionEstimate::zero());
    }

    #[test]
    fn ai_config_builds_generative_estimator() {
        let cfg = config_with(&[
            ("NUTRITION_ESTIMATOR", "ai"),
            ("GENAI_API_KEY", "gen-key"),
            ("GENAI_MODEL", "gemini-test"),
        ]);
        let est = from_config(&cfg).unwrap();
        assert_eq!(est.source(), generative::SOURCE);
        assert_eq!(est.fallback(), generative::PLAUSIBLE_FALLBACK);
    }

    #[test]
    fn missing_key_fails_even_if_config_was_built_by_hand() {
        let mut cfg = config_with(&[("NUTRITION_ESTIMATOR", "ai"), ("GENAI_API_KEY", "gen-key")]);
        cfg.genai.api_key = None;
        let err = from_config(&cfg).err().unwrap();
        assert!(err.to_string().contains("GENAI_API_KEY"));
    }
}
