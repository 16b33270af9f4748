use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::meals::repo_types::{Meal, MealItem, NewMealItem};
use crate::profiles::repo_types::Profile;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert or overwrite by `profile.id`. A `None` full name keeps the stored one.
    async fn upsert_profile(&self, profile: &Profile) -> anyhow::Result<()>;
    async fn get_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>>;
}

#[async_trait]
pub trait MealStore: Send + Sync {
    /// Creates the meal header; the store generates the id.
    async fn create_meal(&self, user_id: &str, meal_type: &str) -> anyhow::Result<Meal>;
    async fn insert_item(&self, item: &NewMealItem) -> anyhow::Result<MealItem>;
    /// Meal plus its items ordered by position.
    async fn get_meal(&self, meal_id: Uuid) -> anyhow::Result<Option<(Meal, Vec<MealItem>)>>;
}

/// Process-local store used when no `DATABASE_URL` is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<String, Profile>>,
    meals: RwLock<HashMap<Uuid, Meal>>,
    items: RwLock<HashMap<Uuid, Vec<MealItem>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn profile_count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn upsert_profile(&self, profile: &Profile) -> anyhow::Result<()> {
        let mut profiles = self.profiles.write().await;
        let mut next = profile.clone();
        if next.full_name.is_none() {
            next.full_name = profiles.get(&profile.id).and_then(|p| p.full_name.clone());
        }
        profiles.insert(next.id.clone(), next);
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}

#[async_trait]
impl MealStore for MemoryStore {
    async fn create_meal(&self, user_id: &str, meal_type: &str) -> anyhow::Result<Meal> {
        let meal = Meal {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            meal_type: meal_type.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.meals.write().await.insert(meal.id, meal.clone());
        Ok(meal)
    }

    async fn insert_item(&self, item: &NewMealItem) -> anyhow::Result<MealItem> {
        anyhow::ensure!(
            self.meals.read().await.contains_key(&item.meal_id),
            "meal {} does not exist",
            item.meal_id
        );
        let row = MealItem {
            id: Uuid::new_v4(),
            meal_id: item.meal_id,
            position: item.position,
            food_name: item.food_name.clone(),
            calories: item.estimate.calories,
            protein_g: item.estimate.protein_g,
            carbs_g: item.estimate.carbs_g,
            fat_g: item.estimate.fat_g,
            weight_grams: item.estimate.weight_grams,
            source: item.source.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.items
            .write()
            .await
            .entry(item.meal_id)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn get_meal(&self, meal_id: Uuid) -> anyhow::Result<Option<(Meal, Vec<MealItem>)>> {
        let Some(meal) = self.meals.read().await.get(&meal_id).cloned() else {
            return Ok(None);
        };
        let mut items = self
            .items
            .read()
            .await
            .get(&meal_id)
            .cloned()
            .unwrap_or_default();
        items.sort_by_key(|i| i.position);
        Ok(Some((meal, items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::NutritionEstimate;

    fn profile(id: &str, name: Option<&str>, calories: i64) -> Profile {
        Profile {
            id: id.into(),
            full_name: name.map(str::to_string),
            weight_kg: 70.0,
            height_cm: 175.0,
            age_years: 25,
            gender: "male".into(),
            activity_level: "sedentary".into(),
            goal: "maintain".into(),
            target_calories: calories,
            target_water_ml: 2450,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_without_duplicates() {
        let store = MemoryStore::new();
        store.upsert_profile(&profile("u1", Some("Sara"), 2044)).await.unwrap();
        store.upsert_profile(&profile("u1", None, 1544)).await.unwrap();

        assert_eq!(store.profile_count().await, 1);
        let p = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(p.target_calories, 1544);
        assert_eq!(p.full_name.as_deref(), Some("Sara"));
    }

    #[tokio::test]
    async fn items_come_back_in_position_order() {
        let store = MemoryStore::new();
        let meal = store.create_meal("u1", "lunch").await.unwrap();
        assert!(!meal.id.is_nil());

        for (pos, name) in [(1, "banana"), (0, "apple")] {
            store
                .insert_item(&NewMealItem {
                    meal_id: meal.id,
                    position: pos,
                    food_name: name.into(),
                    estimate: NutritionEstimate::zero(),
                    source: "static_table".into(),
                })
                .await
                .unwrap();
        }

        let (found, items) = store.get_meal(meal.id).await.unwrap().unwrap();
        assert_eq!(found.meal_type, "lunch");
        let names: Vec<_> = items.iter().map(|i| i.food_name.as_str()).collect();
        assert_eq!(names, ["apple", "banana"]);
    }

    #[tokio::test]
    async fn insert_item_requires_existing_meal() {
        let store = MemoryStore::new();
        let err = store
            .insert_item(&NewMealItem {
                meal_id: Uuid::new_v4(),
                position: 0,
                food_name: "apple".into(),
                estimate: NutritionEstimate::zero(),
                source: "static_table".into(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(store.get_meal(Uuid::new_v4()).await.unwrap().is_none());
    }
}
