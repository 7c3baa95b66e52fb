//! Serving-size table
//!
//! Maps a food name to the grams in one typical serving. Nutrition data
//! arrives per 100 g, so the serving weight sets the scaling multiplier.

use std::collections::HashMap;

use thiserror::Error;

/// Grams assumed for foods not in the table (multiplier 1.0)
pub const DEFAULT_SERVING_GRAMS: f64 = 100.0;

/// Grams the nutrition service reports against
pub const REFERENCE_GRAMS: f64 = 100.0;

/// Built-in serving sizes, keyed by lower-case food name
pub const COMMON_SERVING_SIZES: &[(&str, f64)] = &[
    ("apple", 182.0),          // medium apple
    ("banana", 118.0),         // medium banana
    ("rice", 158.0),           // 1 cup cooked
    ("pizza", 107.0),          // 1 slice
    ("chicken breast", 172.0), // 1 medium breast
    ("sandwich", 230.0),       // 1 regular sandwich
    ("burger", 240.0),         // 1 regular burger
    ("pasta", 140.0),          // 1 cup cooked
];

/// Immutable name → grams-per-serving table
///
/// Built once at startup and shared read-only. Add entries with
/// [`ServingSizeTable::with_entry`] before sharing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ServingSizeTable {
    sizes: HashMap<String, f64>,
}

impl Default for ServingSizeTable {
    fn default() -> Self {
        COMMON_SERVING_SIZES
            .iter()
            .fold(Self::empty(), |table, (name, grams)| table.with_entry(name, *grams))
    }
}

impl ServingSizeTable {
    /// A table with no entries; every lookup yields the default
    pub fn empty() -> Self {
        Self {
            sizes: HashMap::new(),
        }
    }

    /// Add or replace an entry
    pub fn with_entry(mut self, name: &str, grams: f64) -> Self {
        self.sizes.insert(name.to_lowercase(), grams);
        self
    }

    /// Add every `(name, grams)` pair, later pairs replacing earlier ones
    pub fn with_entries<I, S>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        entries
            .into_iter()
            .fold(self, |table, (name, grams)| table.with_entry(name.as_ref(), grams))
    }

    /// Grams per serving, matched case-insensitively
    pub fn lookup(&self, food_name: &str) -> f64 {
        self.sizes
            .get(&food_name.to_lowercase())
            .copied()
            .unwrap_or(DEFAULT_SERVING_GRAMS)
    }

    /// Factor converting per-100 g values to one serving
    pub fn multiplier(&self, food_name: &str) -> f64 {
        self.lookup(food_name) / REFERENCE_GRAMS
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// A malformed entry in a serving-size override list
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServingSizeError {
    #[error("expected name=grams, got '{0}'")]
    MissingSeparator(String),

    #[error("missing food name in '{0}'")]
    MissingName(String),

    #[error("invalid grams in '{0}'")]
    InvalidGrams(String),

    #[error("grams must be positive in '{0}'")]
    NotPositive(String),
}

/// Parse serving-size overrides like `"tofu=120, boiled egg=50"`
pub fn parse_serving_overrides(list: &str) -> Result<Vec<(String, f64)>, ServingSizeError> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (name, grams) = part
                .split_once('=')
                .ok_or_else(|| ServingSizeError::MissingSeparator(part.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ServingSizeError::MissingName(part.to_string()));
            }
            let grams: f64 = grams
                .trim()
                .parse()
                .map_err(|_| ServingSizeError::InvalidGrams(part.to_string()))?;
            if !grams.is_finite() || grams <= 0.0 {
                return Err(ServingSizeError::NotPositive(part.to_string()));
            }
            Ok((name.to_lowercase(), grams))
        })
        .collect()
}
