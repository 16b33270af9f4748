use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// One row of `profiles`, keyed by the client's user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: String,
    pub full_name: Option<String>,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age_years: i32,
    pub gender: String,
    pub activity_level: String,
    pub goal: String,
    pub target_calories: i64,
    pub target_water_ml: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
