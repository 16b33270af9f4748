use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

/// Which nutrition estimator the deployment runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    /// Curated lookup table, no network.
    Static,
    /// Translation + nutrition API.
    Api,
    /// Generative text model.
    Ai,
}

impl FromStr for EstimatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" | "table" => Ok(Self::Static),
            "api" | "ninjas" => Ok(Self::Api),
            "ai" | "genai" | "gemini" => Ok(Self::Ai),
            other => anyhow::bail!("unknown NUTRITION_ESTIMATOR {:?}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NutritionApiConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenAiConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// No database url means the in-memory store.
    pub database_url: Option<String>,
    pub estimator: EstimatorKind,
    pub nutrition_api: NutritionApiConfig,
    pub translate: TranslateConfig,
    pub genai: GenAiConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let estimator = match var("NUTRITION_ESTIMATOR") {
            Some(v) => v.parse()?,
            None => EstimatorKind::Static,
        };

        let config = Self {
            host: or("APP_HOST", "0.0.0.0"),
            port: or("APP_PORT", "8080")
                .parse()
                .context("APP_PORT must be a port number")?,
            database_url: var("DATABASE_URL"),
            estimator,
            nutrition_api: NutritionApiConfig {
                url: or("NUTRITION_API_URL", "https://api.api-ninjas.com"),
                api_key: var("NUTRITION_API_KEY"),
                timeout_secs: parse_secs(var("NUTRITION_API_TIMEOUT_SECS"), 5)?,
            },
            translate: TranslateConfig {
                url: or("TRANSLATE_API_URL", "https://libretranslate.com"),
                api_key: var("TRANSLATE_API_KEY"),
                source_lang: or("TRANSLATE_SOURCE_LANG", "ar"),
                target_lang: or("TRANSLATE_TARGET_LANG", "en"),
            },
            genai: GenAiConfig {
                url: or("GENAI_API_URL", "https://generativelanguage.googleapis.com"),
                api_key: var("GENAI_API_KEY"),
                model: or("GENAI_MODEL", "gemini-1.5-flash"),
                timeout_secs: parse_secs(var("GENAI_TIMEOUT_SECS"), 10)?,
            },
        };
        config.check_credentials()?;
        Ok(config)
    }

    fn check_credentials(&self) -> anyhow::Result<()> {
        match self.estimator {
            EstimatorKind::Static => {}
            EstimatorKind::Api => {
                anyhow::ensure!(
                    self.nutrition_api.api_key.is_some(),
                    "NUTRITION_API_KEY is required when NUTRITION_ESTIMATOR=api"
                );
            }
            EstimatorKind::Ai => {
                anyhow::ensure!(
                    self.genai.api_key.is_some(),
                    "GENAI_API_KEY is required when NUTRITION_ESTIMATOR=ai"
                );
            }
        }
        Ok(())
    }
}

fn parse_secs(raw: Option<String>, default: u64) -> anyhow::Result<u64> {
    match raw {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid timeout seconds {:?}", v)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_use_static_estimator_and_memory_store() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.estimator, EstimatorKind::Static);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.nutrition_api.timeout_secs, 5);
        assert_eq!(cfg.genai.timeout_secs, 10);
        assert_eq!(cfg.translate.source_lang, "ar");
        assert_eq!(cfg.translate.target_lang, "en");
    }

    #[test]
    fn api_estimator_requires_key() {
        let err = config_from(&[("NUTRITION_ESTIMATOR", "api")]).unwrap_err();
        assert!(err.to_string().contains("NUTRITION_API_KEY"));

        let cfg = config_from(&[("NUTRITION_ESTIMATOR", "API"), ("NUTRITION_API_KEY", "k")]).unwrap();
        assert_eq!(cfg.estimator, EstimatorKind::Api);
    }

    #[test]
    fn ai_estimator_requires_key() {
        assert!(config_from(&[("NUTRITION_ESTIMATOR", "ai")]).is_err());
        let cfg = config_from(&[("NUTRITION_ESTIMATOR", "gemini"), ("GENAI_API_KEY", "k")]).unwrap();
        assert_eq!(cfg.estimator, EstimatorKind::Ai);
    }

    #[test]
    fn rejects_unknown_estimator_and_bad_numbers() {
        assert!(config_from(&[("NUTRITION_ESTIMATOR", "oracle")]).is_err());
        assert!(config_from(&[("APP_PORT", "eighty")]).is_err());
        assert!(config_from(&[("GENAI_TIMEOUT_SECS", "-1")]).is_err());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let cfg = config_from(&[("DATABASE_URL", "  "), ("APP_HOST", "")]).unwrap();
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.host, "0.0.0.0");
    }
}
