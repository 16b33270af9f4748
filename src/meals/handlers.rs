use axum::{
    extract::{
        rejection::{FormRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

use super::dto::{LogMealForm, LogMealQuery, LogMealResponse, MealDetails};
use super::services::{self, parse_items};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/log_meal", post(log_meal))
        .route("/meals/:meal_id", get(get_meal))
}

/// POST /log_meal?user_id&meal_type, form field `items`
#[instrument(skip(state, query, form))]
pub async fn log_meal(
    State(state): State<AppState>,
    query: Result<Query<LogMealQuery>, QueryRejection>,
    form: Result<Form<LogMealForm>, FormRejection>,
) -> Result<Json<LogMealResponse>, ApiError> {
    let Query(q) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    let Form(form) = form.map_err(|e| ApiError::validation(e.body_text()))?;

    let user_id = q.user_id.trim();
    let meal_type = q.meal_type.trim();
    if user_id.is_empty() {
        return Err(ApiError::validation("user_id is required"));
    }
    if meal_type.is_empty() {
        return Err(ApiError::validation("meal_type is required"));
    }

    let items = parse_items(&form.items).map_err(|e| {
        warn!(error = %e, %user_id, "rejected items");
        ApiError::validation(e.to_string())
    })?;

    let result = services::log_meal(&state, user_id, meal_type, items).await?;

    let status = if result.failures.is_empty() { "success" } else { "partial" };
    Ok(Json(LogMealResponse {
        status,
        meal_id: result.meal_id,
        items: result.items,
        failures: result.failures,
    }))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MealDetails>, ApiError> {
    let Path(meal_id) = path.map_err(|e| ApiError::validation(e.body_text()))?;
    let (meal, items) = state
        .meals
        .get_meal(meal_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Meal not found".into()))?;
    Ok(Json(MealDetails {
        status: "success",
        meal,
        items,
    }))
}
