use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::ninjas::NutritionApi;
use super::translate::Translator;
use super::{EstimationError, NutritionEstimate, NutritionEstimator};

pub const SOURCE: &str = "nutrition_api";

/// Translates the food name, then maps the first nutrition API result.
pub struct TranslatedLookupEstimator {
    translator: Arc<dyn Translator>,
    api: Arc<dyn NutritionApi>,
    source_lang: String,
    target_lang: String,
}

impl TranslatedLookupEstimator {
    pub fn new(
        translator: Arc<dyn Translator>,
        api: Arc<dyn NutritionApi>,
        source_lang: &str,
        target_lang: &str,
    ) -> Self {
        Self {
            translator,
            api,
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        }
    }

    async fn lookup_term(&self, food: &str) -> Result<String, EstimationError> {
        if self.source_lang.eq_ignore_ascii_case(&self.target_lang) {
            return Ok(food.to_string());
        }
        self.translator
            .translate(food, &self.source_lang, &self.target_lang)
            .await
    }
}

#[async_trait]
impl NutritionEstimator for TranslatedLookupEstimator {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn estimate(&self, food: &str) -> Result<NutritionEstimate, EstimationError> {
        let term = self.lookup_term(food).await?;
        let rows = self.api.query(&term).await?;
        let first = rows
            .into_iter()
            .next()
            .ok_or_else(|| EstimationError::NotFound(term.clone()))?;
        debug!(food, %term, matched = ?first.name, "nutrition api match");

        Ok(NutritionEstimate {
            calories: first.calories.unwrap_or(0.0),
            protein_g: first.protein_g.unwrap_or(0.0),
            carbs_g: first.carbohydrates_total_g.unwrap_or(0.0),
            fat_g: first.fat_total_g.unwrap_or(0.0),
            weight_grams: first.serving_size_g,
        })
    }

    fn fallback(&self) -> NutritionEstimate {
        NutritionEstimate::zero()
    }
}
