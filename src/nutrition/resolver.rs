//! Label resolver
//!
//! Picks one nutrition record out of a ranked list of image labels. Labels
//! at or below the confidence threshold are dropped; the rest are looked up
//! in the order given and the first one with nutrition data wins.

use crate::models::{Label, NutritionRecord};
use crate::services::NutritionSource;

use super::normalizer::normalize;
use super::serving::ServingSizeTable;

/// Labels must score strictly above this to be looked up
pub const CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Labels worth a nutrition lookup, in input order
pub fn candidate_labels(labels: &[Label]) -> impl Iterator<Item = &Label> {
    labels
        .iter()
        .filter(|label| label.confidence > CONFIDENCE_THRESHOLD)
}

/// Resolve ranked labels to the first food the nutrition source knows
///
/// A failed lookup only rules out that one label.
pub async fn resolve(
    table: &ServingSizeTable,
    labels: &[Label],
    source: &dyn NutritionSource,
) -> Option<NutritionRecord> {
    let mut tried = 0usize;

    for label in candidate_labels(labels) {
        tried += 1;
        tracing::debug!("Trying nutrition lookup for '{}'", label.name);

        match source.fetch(&label.name).await {
            Ok(Some(raw)) => {
                tracing::info!(
                    "Found nutrition data for '{}' (confidence {:.2})",
                    label.name,
                    label.confidence
                );
                return Some(normalize(table, &label.name, &raw));
            }
            Ok(None) => {
                tracing::debug!("No nutrition data for '{}'", label.name);
            }
            Err(e) => {
                tracing::warn!("Nutrition lookup for '{}' failed: {}", label.name, e);
            }
        }
    }

    if tried == 0 {
        tracing::info!(
            "No labels above confidence {} out of {}",
            CONFIDENCE_THRESHOLD,
            labels.len()
        );
    } else {
        tracing::info!("None of {} candidate labels had nutrition data", tried);
    }
    None
}
