use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::meals::repo_types::{Meal, MealItem};

#[derive(Debug, Deserialize)]
pub struct LogMealQuery {
    pub user_id: String,
    pub meal_type: String,
}

#[derive(Debug, Deserialize)]
pub struct LogMealForm {
    /// JSON array of strings, or plain text for a single item.
    pub items: String,
}

/// An item whose estimate succeeded or fell back but could not be stored.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub index: usize,
    pub food_name: String,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct LogMealResponse {
    pub status: &'static str,
    pub meal_id: Uuid,
    pub items: Vec<MealItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemFailure>,
}

#[derive(Debug, Serialize)]
pub struct MealDetails {
    pub status: &'static str,
    pub meal: Meal,
    pub items: Vec<MealItem>,
}
