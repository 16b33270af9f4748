use serde::{Deserialize, Serialize};

use crate::profiles::repo_types::Profile;

#[derive(Debug, Deserialize)]
pub struct CalculateGoalsQuery {
    pub user_id: String,
    pub weight: f64,
    pub height: f64,
    pub age: u32,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalculateGoalsResponse {
    pub status: &'static str,
    pub target_calories: i64,
    pub target_water_ml: i64,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub status: &'static str,
    pub profile: Profile,
}
