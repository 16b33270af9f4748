//! Mifflin-St Jeor energy targets and daily water intake.

use serde::{Deserialize, Serialize};

/// Calories added or removed for a gain/lose goal.
pub const GOAL_ADJUSTMENT_KCAL: f64 = 500.0;

/// Daily water per kilogram of body weight.
pub const WATER_ML_PER_KG: f64 = 35.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Lose,
    Gain,
    Maintain,
}

impl Gender {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("male") {
            Gender::Male
        } else {
            Gender::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Other => "other",
        }
    }

    fn bmr_offset(self) -> f64 {
        match self {
            Gender::Male => 5.0,
            Gender::Other => -161.0,
        }
    }
}

impl ActivityLevel {
    /// Unrecognized labels count as sedentary.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => ActivityLevel::Light,
            "moderate" => ActivityLevel::Moderate,
            "active" => ActivityLevel::Active,
            _ => ActivityLevel::Sedentary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
        }
    }
}

impl Goal {
    /// Unrecognized labels count as maintain.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lose" => Goal::Lose,
            "gain" => Goal::Gain,
            _ => Goal::Maintain,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Goal::Lose => "lose",
            Goal::Gain => "gain",
            Goal::Maintain => "maintain",
        }
    }

    fn adjustment(self) -> f64 {
        match self {
            Goal::Lose => -GOAL_ADJUSTMENT_KCAL,
            Goal::Gain => GOAL_ADJUSTMENT_KCAL,
            Goal::Maintain => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Targets {
    pub target_calories: i64,
    pub target_water_ml: i64,
}

pub fn basal_metabolic_rate(weight_kg: f64, height_cm: f64, age_years: u32, gender: Gender) -> f64 {
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age_years) + gender.bmr_offset()
}

/// Both targets truncate toward zero. No range checks happen here.
pub fn compute_goals(
    weight_kg: f64,
    height_cm: f64,
    age_years: u32,
    gender: Gender,
    activity: ActivityLevel,
    goal: Goal,
) -> Targets {
    let bmr = basal_metabolic_rate(weight_kg, height_cm, age_years, gender);
    let tdee = bmr * activity.multiplier();
    Targets {
        target_calories: (tdee + goal.adjustment()).trunc() as i64,
        target_water_ml: (weight_kg * WATER_ML_PER_KG).trunc() as i64,
    }
}
