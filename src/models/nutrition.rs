//! Nutrition data structures
//!
//! `RawNutrition` is what the nutrition service returns (per 100 g);
//! `NutritionRecord` is the serving-scaled, display-rounded result.

use serde::{Deserialize, Deserializer, Serialize};

/// Nutrient quantities per 100 g, as returned by the nutrition service
///
/// Absent or non-numeric fields decode as 0. The free API tier replaces
/// some fields with a "premium only" string, which must not fail the decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNutrition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat_total_g: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbohydrates_total_g: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fiber_g: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sugar_g: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sodium_mg: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub potassium_mg: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cholesterol_mg: f64,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or(0.0))
}

/// Resolved nutrition facts for one serving of an identified food
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub food: String,
    pub serving_size: f64, // grams
    pub fat: f64,          // grams, 1 decimal
    pub carbs: f64,        // grams, 1 decimal
    pub fiber: f64,        // grams, 1 decimal
    pub sugar: f64,        // grams, 1 decimal
    pub sodium: i64,       // milligrams
    pub potassium: i64,    // milligrams
    pub cholesterol: i64,  // milligrams
}
