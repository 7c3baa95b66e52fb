//! Nutrition normalizer
//!
//! Scales a per-100 g nutrition profile to one serving and rounds it for
//! display. Scaling always happens before rounding, field by field.

use crate::models::{NutritionRecord, RawNutrition};

use super::serving::ServingSizeTable;

/// Round to `decimals` places, ties to even
///
/// Works on the exact binary value: 0.15 is stored just below the tie and
/// rounds to 0.1, 2.45 just above it and rounds to 2.5. Scaling by a power of
/// ten first would lose that distinction.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// Round to a whole number, ties to even
fn round_whole(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Build the serving-sized record for `food_name` from per-100 g values
pub fn normalize(table: &ServingSizeTable, food_name: &str, raw: &RawNutrition) -> NutritionRecord {
    let serving_size = table.lookup(food_name);
    let multiplier = table.multiplier(food_name);

    NutritionRecord {
        food: food_name.to_string(),
        serving_size,
        fat: round_to(raw.fat_total_g * multiplier, 1),
        carbs: round_to(raw.carbohydrates_total_g * multiplier, 1),
        fiber: round_to(raw.fiber_g * multiplier, 1),
        sugar: round_to(raw.sugar_g * multiplier, 1),
        sodium: round_whole(raw.sodium_mg * multiplier),
        potassium: round_whole(raw.potassium_mg * multiplier),
        cholesterol: round_whole(raw.cholesterol_mg * multiplier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pizza_raw() -> RawNutrition {
        RawNutrition {
            name: Some("pizza".to_string()),
            fat_total_g: 10.0,
            carbohydrates_total_g: 33.0,
            fiber_g: 2.3,
            sugar_g: 3.8,
            sodium_mg: 640.0,
            potassium_mg: 180.0,
            cholesterol_mg: 18.0,
        }
    }

    #[test]
    fn test_pizza_slice() {
        let record = normalize(&ServingSizeTable::default(), "pizza", &pizza_raw());
        assert_eq!(
            record,
            NutritionRecord {
                food: "pizza".to_string(),
                serving_size: 107.0,
                fat: 10.7,
                carbs: 35.3,
                fiber: 2.5,
                sugar: 4.1,
                sodium: 685,
                potassium: 193,
                cholesterol: 19,
            }
        );
    }

    #[test]
    fn test_unknown_food_keeps_raw_values() {
        let raw = RawNutrition {
            fat_total_g: 1.24,
            carbohydrates_total_g: 7.0,
            fiber_g: 0.36,
            sugar_g: 0.0,
            sodium_mg: 12.4,
            potassium_mg: 301.6,
            cholesterol_mg: 0.0,
            ..Default::default()
        };
        let record = normalize(&ServingSizeTable::default(), "kale", &raw);

        assert_eq!(record.serving_size, 100.0);
        assert_eq!(record.fat, 1.2);
        assert_eq!(record.carbs, 7.0);
        assert_eq!(record.fiber, 0.4);
        assert_eq!(record.sugar, 0.0);
        assert_eq!(record.sodium, 12);
        assert_eq!(record.potassium, 302);
        assert_eq!(record.cholesterol, 0);
    }

    #[test]
    fn test_each_field_is_scaled_then_rounded() {
        let table = ServingSizeTable::default();
        let raw = RawNutrition {
            fat_total_g: 0.17,
            carbohydrates_total_g: 13.81,
            fiber_g: 2.4,
            sugar_g: 10.39,
            sodium_mg: 1.0,
            potassium_mg: 107.0,
            cholesterol_mg: 0.4,
            ..Default::default()
        };

        // (food, serving, fat, carbs, fiber, sugar, sodium, potassium, cholesterol)
        let expected = [
            ("apple", 182.0, 0.3, 25.1, 4.4, 18.9, 2, 195, 1),
            ("banana", 118.0, 0.2, 16.3, 2.8, 12.3, 1, 126, 0),
            ("Burger", 240.0, 0.4, 33.1, 5.8, 24.9, 2, 257, 1),
            ("unknown", 100.0, 0.2, 13.8, 2.4, 10.4, 1, 107, 0),
        ];

        for (food, serving, fat, carbs, fiber, sugar, sodium, potassium, cholesterol) in expected {
            let record = normalize(&table, food, &raw);
            assert_eq!(record.serving_size, serving, "{}", food);
            assert_eq!(
                (record.fat, record.carbs, record.fiber, record.sugar),
                (fat, carbs, fiber, sugar),
                "{}",
                food
            );
            assert_eq!(
                (record.sodium, record.potassium, record.cholesterol),
                (sodium, potassium, cholesterol),
                "{}",
                food
            );
        }
    }

    #[test]
    fn test_gram_fields_round_from_stored_value() {
        // 0.15, 0.35, 1.15 and 12.35 sit just below their ties; 2.45 and 0.05 just above
        let cases = [
            (0.15, 0.1),
            (0.35, 0.3),
            (1.15, 1.1),
            (12.35, 12.3),
            (2.45, 2.5),
            (0.05, 0.1),
        ];

        for (value, expected) in cases {
            let raw = RawNutrition {
                fat_total_g: value,
                ..Default::default()
            };
            let record = normalize(&ServingSizeTable::default(), "kale", &raw);
            assert_eq!(record.fat, expected, "fat {}", value);
        }
    }

    #[test]
    fn test_milligram_fields_round_half_to_even() {
        let raw = RawNutrition {
            sodium_mg: 2.5,
            potassium_mg: 3.5,
            cholesterol_mg: 0.5,
            ..Default::default()
        };
        let record = normalize(&ServingSizeTable::default(), "kale", &raw);
        assert_eq!(record.sodium, 2);
        assert_eq!(record.potassium, 4);
        assert_eq!(record.cholesterol, 0);
    }

    #[test]
    fn test_rounding_after_scaling_not_before() {
        // 0.04 rounds to 0.0 on its own, but 0.04 * 2.4 = 0.096 rounds to 0.1
        let raw = RawNutrition {
            fiber_g: 0.04,
            ..Default::default()
        };
        let record = normalize(&ServingSizeTable::default(), "burger", &raw);
        assert_eq!(record.fiber, 0.1);
    }

    #[test]
    fn test_missing_fields_are_zero() {
        let record = normalize(&ServingSizeTable::default(), "apple", &RawNutrition::default());
        assert_eq!(record.serving_size, 182.0);
        assert_eq!(record.fat, 0.0);
        assert_eq!(record.sodium, 0);
    }

    #[test]
    fn test_round_ties_to_even() {
        assert_eq!(round_to(0.25, 1), 0.2);
        assert_eq!(round_whole(2.5), 2);
        assert_eq!(round_whole(3.5), 4);
    }

    #[test]
    fn test_food_name_is_kept_verbatim() {
        let record = normalize(&ServingSizeTable::default(), "Banana", &RawNutrition::default());
        assert_eq!(record.food, "Banana");
        assert_eq!(record.serving_size, 118.0);
    }
}
