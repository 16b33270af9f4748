use async_trait::async_trait;

use super::{EstimationError, NutritionEstimate, NutritionEstimator};

pub const SOURCE: &str = "static_table";

/// Returned when no table key matches.
pub const GENERIC_AVERAGE: NutritionEstimate = NutritionEstimate::new(200.0, 8.0, 25.0, 7.0, Some(150.0));

struct Entry {
    keys: &'static [&'static str],
    estimate: NutritionEstimate,
}

// Per typical single serving.
static ENTRIES: &[Entry] = &[
    Entry { keys: &["apple", "تفاح", "تفاحة"], estimate: NutritionEstimate::new(95.0, 0.5, 25.0, 0.3, Some(182.0)) },
    Entry { keys: &["banana", "موز", "موزة"], estimate: NutritionEstimate::new(105.0, 1.3, 27.0, 0.4, Some(118.0)) },
    Entry { keys: &["orange", "برتقال", "برتقالة"], estimate: NutritionEstimate::new(62.0, 1.2, 15.4, 0.2, Some(131.0)) },
    Entry { keys: &["rice", "أرز", "رز"], estimate: NutritionEstimate::new(205.0, 4.3, 45.0, 0.4, Some(158.0)) },
    Entry { keys: &["bread", "خبز", "عيش"], estimate: NutritionEstimate::new(80.0, 3.0, 15.0, 1.0, Some(30.0)) },
    Entry { keys: &["egg", "بيض", "بيضة"], estimate: NutritionEstimate::new(78.0, 6.3, 0.6, 5.3, Some(50.0)) },
    Entry { keys: &["chicken", "دجاج", "فراخ"], estimate: NutritionEstimate::new(165.0, 31.0, 0.0, 3.6, Some(100.0)) },
    Entry { keys: &["beef", "لحم"], estimate: NutritionEstimate::new(250.0, 26.0, 0.0, 15.0, Some(100.0)) },
    Entry { keys: &["fish", "سمك"], estimate: NutritionEstimate::new(206.0, 22.0, 0.0, 12.0, Some(100.0)) },
    Entry { keys: &["milk", "حليب", "لبن"], estimate: NutritionEstimate::new(122.0, 8.0, 12.0, 4.8, Some(244.0)) },
    Entry { keys: &["yogurt", "زبادي"], estimate: NutritionEstimate::new(100.0, 17.0, 6.0, 0.7, Some(170.0)) },
    Entry { keys: &["cheese", "جبن", "جبنة"], estimate: NutritionEstimate::new(113.0, 7.0, 0.4, 9.3, Some(28.0)) },
    Entry { keys: &["dates", "تمر"], estimate: NutritionEstimate::new(66.0, 0.4, 18.0, 0.0, Some(24.0)) },
    Entry { keys: &["hummus", "حمص"], estimate: NutritionEstimate::new(166.0, 7.9, 14.3, 9.6, Some(100.0)) },
    Entry { keys: &["falafel", "فلافل"], estimate: NutritionEstimate::new(333.0, 13.3, 31.8, 17.8, Some(100.0)) },
    Entry { keys: &["potato", "بطاطس", "بطاطا"], estimate: NutritionEstimate::new(161.0, 4.3, 37.0, 0.2, Some(173.0)) },
    Entry { keys: &["salad", "سلطة"], estimate: NutritionEstimate::new(33.0, 2.0, 6.0, 0.4, Some(150.0)) },
    Entry { keys: &["pasta", "مكرونة", "معكرونة"], estimate: NutritionEstimate::new(220.0, 8.1, 43.0, 1.3, Some(140.0)) },
    Entry { keys: &["coffee", "قهوة"], estimate: NutritionEstimate::new(2.0, 0.3, 0.0, 0.0, Some(240.0)) },
    Entry { keys: &["tea", "شاي"], estimate: NutritionEstimate::new(2.0, 0.0, 0.7, 0.0, Some(240.0)) },
];

/// Case-insensitive substring match against a small curated table.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticTableEstimator;

impl StaticTableEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Longest matching key wins.
    pub fn lookup(&self, food: &str) -> Option<NutritionEstimate> {
        let needle = food.trim().to_lowercase();
        ENTRIES
            .iter()
            .flat_map(|e| e.keys.iter().map(move |k| (*k, e.estimate)))
            .filter(|(k, _)| needle.contains(k))
            .max_by_key(|(k, _)| k.chars().count())
            .map(|(_, est)| est)
    }
}

#[async_trait]
impl NutritionEstimator for StaticTableEstimator {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn estimate(&self, food: &str) -> Result<NutritionEstimate, EstimationError> {
        Ok(self.lookup(food).unwrap_or(GENERIC_AVERAGE))
    }

    fn fallback(&self) -> NutritionEstimate {
        GENERIC_AVERAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matches_case_insensitive_substrings() {
        let t = StaticTableEstimator::new();
        let apple = t.estimate("Green APPLE, sliced").await.unwrap();
        assert_eq!(apple.calories, 95.0);

        let banana = t.estimate("banana").await.unwrap();
        assert_eq!(banana.calories, 105.0);
    }

    #[tokio::test]
    async fn matches_arabic_keys() {
        let t = StaticTableEstimator::new();
        assert_eq!(t.estimate("صحن أرز").await.unwrap().calories, 205.0);
        assert_eq!(t.estimate("موز").await.unwrap().calories, 105.0);
    }

    #[test]
    fn longest_key_wins() {
        let t = StaticTableEstimator::new();
        assert_eq!(t.lookup("chicken with rice").map(|e| e.calories), Some(165.0));
        assert_eq!(t.lookup("pasta").map(|e| e.calories), Some(220.0));
    }

    #[tokio::test]
    async fn unknown_food_gets_generic_average() {
        let t = StaticTableEstimator::new();
        assert!(t.lookup("quinoa bowl").is_none());
        assert_eq!(t.estimate("quinoa bowl").await.unwrap(), GENERIC_AVERAGE);
        assert!(GENERIC_AVERAGE.calories > 0.0);
    }
}
