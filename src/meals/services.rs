use anyhow::Context;
use thiserror::Error;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::meals::dto::ItemFailure;
use crate::meals::repo_types::{MealItem, NewMealItem};
use crate::nutrition::estimate_or_fallback;
use crate::state::AppState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemsError {
    #[error("items is required")]
    Empty,
    #[error("items must be a JSON array of strings: {0}")]
    Malformed(String),
}

/// Parses the `items` field.
///
/// Text starting with `[` must be a JSON array of strings. Any other text is a
/// single item. Entries are trimmed and blank ones dropped.
pub fn parse_items(raw: &str) -> Result<Vec<String>, ItemsError> {
    let trimmed = raw.trim();
    let items: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<String>>(trimmed)
            .map_err(|e| ItemsError::Malformed(e.to_string()))?
    } else {
        vec![trimmed.to_string()]
    };

    let items: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() {
        return Err(ItemsError::Empty);
    }
    Ok(items)
}

#[derive(Debug)]
pub struct MealLogResult {
    pub meal_id: Uuid,
    pub items: Vec<MealItem>,
    pub failures: Vec<ItemFailure>,
}

/// Creates the meal, then estimates and stores each item in input order.
///
/// Estimation never fails an item. Item writes are independent: a failed
/// write is reported in `failures` and earlier items stay stored.
#[instrument(skip(st, items), fields(items = items.len()))]
pub async fn log_meal(
    st: &AppState,
    user_id: &str,
    meal_type: &str,
    items: Vec<String>,
) -> anyhow::Result<MealLogResult> {
    let meal = st
        .meals
        .create_meal(user_id, meal_type)
        .await
        .context("create meal")?;
    anyhow::ensure!(!meal.id.is_nil(), "store returned no meal id");

    let mut stored = Vec::with_capacity(items.len());
    let mut failures = Vec::new();

    for (index, food_name) in items.into_iter().enumerate() {
        let resolved = estimate_or_fallback(st.estimator.as_ref(), &food_name).await;
        let new_item = NewMealItem {
            meal_id: meal.id,
            position: i32::try_from(index).context("too many items")?,
            food_name,
            estimate: resolved.estimate,
            source: resolved.source.to_string(),
        };

        match st.meals.insert_item(&new_item).await {
            Ok(row) => stored.push(row),
            Err(e) => {
                error!(error = %format!("{:#}", e), meal_id = %meal.id, index, "store meal item failed");
                failures.push(ItemFailure {
                    index,
                    food_name: new_item.food_name,
                    detail: e.to_string(),
                });
            }
        }
    }

    info!(
        meal_id = %meal.id,
        stored = stored.len(),
        failed = failures.len(),
        "meal logged"
    );
    Ok(MealLogResult {
        meal_id: meal.id,
        items: stored,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::repo_types::Meal;
    use crate::nutrition::{EstimationError, NutritionEstimate, NutritionEstimator, FALLBACK_SOURCE};
    use crate::store::{MealStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::Arc;

    #[test]
    fn parses_json_array() {
        assert_eq!(
            parse_items(r#"["apple", " banana ", ""]"#).unwrap(),
            vec!["apple".to_string(), "banana".to_string()]
        );
        assert_eq!(parse_items(r#"["تفاح","موز"]"#).unwrap().len(), 2);
    }

    #[test]
    fn bare_text_is_one_item() {
        assert_eq!(parse_items("apple, banana").unwrap(), vec!["apple, banana".to_string()]);
        assert_eq!(parse_items("  rice  ").unwrap(), vec!["rice".to_string()]);
    }

    #[test]
    fn rejects_broken_arrays_and_empty_input() {
        assert!(matches!(parse_items(r#"["apple", "banana""#), Err(ItemsError::Malformed(_))));
        assert!(matches!(parse_items("[1, 2]"), Err(ItemsError::Malformed(_))));
        assert_eq!(parse_items("   "), Err(ItemsError::Empty));
        assert_eq!(parse_items("[]"), Err(ItemsError::Empty));
        assert_eq!(parse_items(r#"["  "]"#), Err(ItemsError::Empty));
    }

    /// Fails for any item containing "bad".
    struct PickyEstimator;

    #[async_trait]
    impl NutritionEstimator for PickyEstimator {
        fn source(&self) -> &'static str {
            "picky"
        }
        async fn estimate(&self, food: &str) -> Result<NutritionEstimate, EstimationError> {
            if food.contains("bad") {
                return Err(EstimationError::Request("connection reset".into()));
            }
            Ok(NutritionEstimate::new(100.0, 1.0, 2.0, 3.0, Some(50.0)))
        }
        fn fallback(&self) -> NutritionEstimate {
            NutritionEstimate::new(7.0, 0.0, 0.0, 0.0, None)
        }
    }

    /// Rejects writes for one position, delegates the rest.
    struct FlakyItems {
        inner: MemoryStore,
        fail_position: i32,
    }

    #[async_trait]
    impl MealStore for FlakyItems {
        async fn create_meal(&self, user_id: &str, meal_type: &str) -> anyhow::Result<Meal> {
            self.inner.create_meal(user_id, meal_type).await
        }
        async fn insert_item(&self, item: &NewMealItem) -> anyhow::Result<MealItem> {
            anyhow::ensure!(item.position != self.fail_position, "disk full");
            self.inner.insert_item(item).await
        }
        async fn get_meal(&self, meal_id: Uuid) -> anyhow::Result<Option<(Meal, Vec<MealItem>)>> {
            self.inner.get_meal(meal_id).await
        }
    }

    /// Never hands back a usable id.
    struct NoIdStore;

    #[async_trait]
    impl MealStore for NoIdStore {
        async fn create_meal(&self, user_id: &str, meal_type: &str) -> anyhow::Result<Meal> {
            Ok(Meal {
                id: Uuid::nil(),
                user_id: user_id.into(),
                meal_type: meal_type.into(),
                created_at: time::OffsetDateTime::now_utc(),
            })
        }
        async fn insert_item(&self, _item: &NewMealItem) -> anyhow::Result<MealItem> {
            anyhow::bail!("unreachable")
        }
        async fn get_meal(&self, _meal_id: Uuid) -> anyhow::Result<Option<(Meal, Vec<MealItem>)>> {
            Ok(None)
        }
    }

    fn state_with(meals: Arc<dyn MealStore>) -> AppState {
        let mut st = AppState::fake();
        st.meals = meals;
        st.estimator = Arc::new(PickyEstimator);
        st
    }

    #[tokio::test]
    async fn logs_each_item_with_original_name() {
        let st = AppState::fake();
        let out = log_meal(&st, "u1", "lunch", vec!["apple".into(), "banana".into()])
            .await
            .unwrap();

        assert_eq!(out.items.len(), 2);
        assert!(out.failures.is_empty());
        assert_eq!(out.items[0].food_name, "apple");
        assert_eq!(out.items[1].food_name, "banana");
        assert!(out.items.iter().all(|i| i.calories >= 0.0 && i.meal_id == out.meal_id));

        let (meal, stored) = st.meals.get_meal(out.meal_id).await.unwrap().unwrap();
        assert_eq!(meal.user_id, "u1");
        assert_eq!(stored, out.items);
    }

    #[tokio::test]
    async fn estimator_failure_does_not_stop_other_items() {
        let st = state_with(Arc::new(MemoryStore::new()));
        let out = log_meal(
            &st,
            "u1",
            "dinner",
            vec!["soup".into(), "bad fish".into(), "bread".into()],
        )
        .await
        .unwrap();

        assert_eq!(out.items.len(), 3);
        assert_eq!(out.items[1].source, FALLBACK_SOURCE);
        assert_eq!(out.items[1].calories, 7.0);
        assert_eq!(out.items[0].source, "picky");
        assert_eq!(out.items[2].calories, 100.0);
    }

    #[tokio::test]
    async fn item_write_failure_is_reported_without_rollback() {
        let st = state_with(Arc::new(FlakyItems {
            inner: MemoryStore::new(),
            fail_position: 1,
        }));
        let out = log_meal(&st, "u1", "snack", vec!["a".into(), "b".into(), "c".into()])
            .await
            .unwrap();

        let names: Vec<_> = out.items.iter().map(|i| i.food_name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].index, 1);
        assert_eq!(out.failures[0].food_name, "b");
        assert!(out.failures[0].detail.contains("disk full"));

        let (_, stored) = st.meals.get_meal(out.meal_id).await.unwrap().unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn missing_meal_id_fails_the_request() {
        let st = state_with(Arc::new(NoIdStore));
        let err = log_meal(&st, "u1", "lunch", vec!["apple".into()]).await.unwrap_err();
        assert!(err.to_string().contains("no meal id"));
    }
}
