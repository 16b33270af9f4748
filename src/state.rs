use crate::config::AppConfig;
use crate::db::{self, PgStore};
use crate::nutrition::{self, NutritionEstimator};
use crate::store::{MealStore, MemoryStore, ProfileStore};
use std::sync::Arc;

/// Collaborators built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub profiles: Arc<dyn ProfileStore>,
    pub meals: Arc<dyn MealStore>,
    pub estimator: Arc<dyn NutritionEstimator>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (profiles, meals): (Arc<dyn ProfileStore>, Arc<dyn MealStore>) =
            match &config.database_url {
                Some(url) => {
                    let store = Arc::new(PgStore::new(db::connect(url).await?));
                    let profiles: Arc<dyn ProfileStore> = store.clone();
                    let meals: Arc<dyn MealStore> = store;
                    (profiles, meals)
                }
                None => {
                    tracing::warn!("DATABASE_URL not set; using in-memory store");
                    let store = Arc::new(MemoryStore::new());
                    let profiles: Arc<dyn ProfileStore> = store.clone();
                    let meals: Arc<dyn MealStore> = store;
                    (profiles, meals)
                }
            };

        let estimator = nutrition::from_config(&config)?;

        Ok(Self::from_parts(config, profiles, meals, estimator))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        profiles: Arc<dyn ProfileStore>,
        meals: Arc<dyn MealStore>,
        estimator: Arc<dyn NutritionEstimator>,
    ) -> Self {
        Self {
            config,
            profiles,
            meals,
            estimator,
        }
    }

    /// In-memory store with the static table estimator.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig::from_lookup(|_| None).expect("default config"));
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(
            config,
            store.clone(),
            store,
            Arc::new(nutrition::table::StaticTableEstimator::new()),
        )
    }
}
