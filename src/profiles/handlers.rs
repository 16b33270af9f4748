use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{error::ApiError, state::AppState};

use super::calc::{compute_goals, ActivityLevel, Gender, Goal};
use super::dto::{CalculateGoalsQuery, CalculateGoalsResponse, ProfileResponse};
use super::repo_types::Profile;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/calculate_goals", post(calculate_goals))
        .route("/profiles/:user_id", get(get_profile))
}

fn validate(q: &CalculateGoalsQuery) -> Result<(), ApiError> {
    if q.user_id.trim().is_empty() {
        return Err(ApiError::validation("user_id is required"));
    }
    if !q.weight.is_finite() || q.weight <= 0.0 {
        return Err(ApiError::validation("weight must be a positive number"));
    }
    if !q.height.is_finite() || q.height <= 0.0 {
        return Err(ApiError::validation("height must be a positive number"));
    }
    if q.age == 0 || i32::try_from(q.age).is_err() {
        return Err(ApiError::validation("age must be a positive integer"));
    }
    Ok(())
}

/// POST /calculate_goals?user_id&weight&height&age&gender&activity&goal
#[instrument(skip(state, query))]
pub async fn calculate_goals(
    State(state): State<AppState>,
    query: Result<Query<CalculateGoalsQuery>, QueryRejection>,
) -> Result<Json<CalculateGoalsResponse>, ApiError> {
    let Query(q) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    validate(&q)?;

    let gender = Gender::parse(q.gender.as_deref().unwrap_or_default());
    let activity = ActivityLevel::parse(q.activity.as_deref().unwrap_or_default());
    let goal = Goal::parse(q.goal.as_deref().unwrap_or_default());
    let targets = compute_goals(q.weight, q.height, q.age, gender, activity, goal);

    let profile = Profile {
        id: q.user_id.trim().to_string(),
        full_name: q
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        weight_kg: q.weight,
        height_cm: q.height,
        age_years: q.age as i32,
        gender: gender.as_str().to_string(),
        activity_level: activity.as_str().to_string(),
        goal: goal.as_str().to_string(),
        target_calories: targets.target_calories,
        target_water_ml: targets.target_water_ml,
        updated_at: OffsetDateTime::now_utc(),
    };
    state.profiles.upsert_profile(&profile).await?;

    info!(
        user_id = %profile.id,
        target_calories = targets.target_calories,
        target_water_ml = targets.target_water_ml,
        "goals calculated"
    );
    Ok(Json(CalculateGoalsResponse {
        status: "success",
        target_calories: targets.target_calories,
        target_water_ml: targets.target_water_ml,
    }))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Path(user_id) = path.map_err(|e| ApiError::validation(e.body_text()))?;
    let profile = state
        .profiles
        .get_profile(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;
    Ok(Json(ProfileResponse {
        status: "success",
        profile,
    }))
}
