use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::meals::repo_types::{Meal, MealItem, NewMealItem};
use crate::profiles::repo_types::Profile;
use crate::store::{MealStore, ProfileStore};

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;

    // Run migrations if present
    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }
    Ok(db)
}

/// Postgres-backed profile and meal store.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn upsert_profile(&self, p: &Profile) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, weight_kg, height_cm, age_years, gender,
                                  activity_level, goal, target_calories, target_water_ml, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                full_name       = COALESCE(EXCLUDED.full_name, profiles.full_name),
                weight_kg       = EXCLUDED.weight_kg,
                height_cm       = EXCLUDED.height_cm,
                age_years       = EXCLUDED.age_years,
                gender          = EXCLUDED.gender,
                activity_level  = EXCLUDED.activity_level,
                goal            = EXCLUDED.goal,
                target_calories = EXCLUDED.target_calories,
                target_water_ml = EXCLUDED.target_water_ml,
                updated_at      = EXCLUDED.updated_at
            "#,
        )
        .bind(&p.id)
        .bind(&p.full_name)
        .bind(p.weight_kg)
        .bind(p.height_cm)
        .bind(p.age_years)
        .bind(&p.gender)
        .bind(&p.activity_level)
        .bind(&p.goal)
        .bind(p.target_calories)
        .bind(p.target_water_ml)
        .bind(p.updated_at)
        .execute(&self.db)
        .await
        .context("upsert profile")?;
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, full_name, weight_kg, height_cm, age_years, gender,
                   activity_level, goal, target_calories, target_water_ml, updated_at
              FROM profiles
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get profile")?;
        Ok(row)
    }
}

#[async_trait]
impl MealStore for PgStore {
    async fn create_meal(&self, user_id: &str, meal_type: &str) -> anyhow::Result<Meal> {
        let meal = sqlx::query_as::<_, Meal>(
            r#"
            INSERT INTO meals (user_id, meal_type)
            VALUES ($1, $2)
            RETURNING id, user_id, meal_type, created_at
            "#,
        )
        .bind(user_id)
        .bind(meal_type)
        .fetch_one(&self.db)
        .await
        .context("create meal")?;
        Ok(meal)
    }

    async fn insert_item(&self, item: &NewMealItem) -> anyhow::Result<MealItem> {
        let row = sqlx::query_as::<_, MealItem>(
            r#"
            INSERT INTO meal_items (meal_id, position, food_name, calories, protein_g,
                                    carbs_g, fat_g, weight_grams, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, meal_id, position, food_name, calories, protein_g,
                      carbs_g, fat_g, weight_grams, source, created_at
            "#,
        )
        .bind(item.meal_id)
        .bind(item.position)
        .bind(&item.food_name)
        .bind(item.estimate.calories)
        .bind(item.estimate.protein_g)
        .bind(item.estimate.carbs_g)
        .bind(item.estimate.fat_g)
        .bind(item.estimate.weight_grams)
        .bind(&item.source)
        .fetch_one(&self.db)
        .await
        .with_context(|| format!("insert meal item {}", item.position))?;
        Ok(row)
    }

    async fn get_meal(&self, meal_id: Uuid) -> anyhow::Result<Option<(Meal, Vec<MealItem>)>> {
        let meal = sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, user_id, meal_type, created_at
              FROM meals
             WHERE id = $1
            "#,
        )
        .bind(meal_id)
        .fetch_optional(&self.db)
        .await
        .context("get meal")?;

        let Some(meal) = meal else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, MealItem>(
            r#"
            SELECT id, meal_id, position, food_name, calories, protein_g,
                   carbs_g, fat_g, weight_grams, source, created_at
              FROM meal_items
             WHERE meal_id = $1
             ORDER BY position ASC
            "#,
        )
        .bind(meal_id)
        .fetch_all(&self.db)
        .await
        .context("list meal items")?;

        Ok(Some((meal, items)))
    }
}
