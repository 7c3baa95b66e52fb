//! Resolution pipeline
//!
//! Image bytes in, one nutrition record (or nothing) out. Labeling failures
//! end here as "not identified"; they are never returned to the caller.

use std::sync::Arc;

use crate::models::NutritionRecord;
use crate::services::{ImageLabeler, NutritionSource};

use super::resolver::resolve;
use super::serving::ServingSizeTable;

/// Labeler + nutrition source + serving table, wired together
#[derive(Clone)]
pub struct ResolutionPipeline {
    labeler: Arc<dyn ImageLabeler>,
    nutrition: Arc<dyn NutritionSource>,
    serving_sizes: Arc<ServingSizeTable>,
}

impl ResolutionPipeline {
    pub fn new(
        labeler: Arc<dyn ImageLabeler>,
        nutrition: Arc<dyn NutritionSource>,
        serving_sizes: Arc<ServingSizeTable>,
    ) -> Self {
        Self {
            labeler,
            nutrition,
            serving_sizes,
        }
    }

    pub fn serving_sizes(&self) -> &ServingSizeTable {
        &self.serving_sizes
    }

    /// Identify the food in an image and return its per-serving nutrition
    pub async fn identify(&self, image: &[u8]) -> Option<NutritionRecord> {
        let labels = match self.labeler.detect_labels(image).await {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!("Image labeling failed: {}", e);
                return None;
            }
        };

        for label in &labels {
            tracing::info!("Label '{}' (confidence {:.3})", label.name, label.confidence);
        }

        resolve(&self.serving_sizes, &labels, self.nutrition.as_ref()).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::models::{Label, RawNutrition};
    use crate::nutrition::resolver::tests::StubSource;
    use crate::services::{ServiceError, ServiceResult};

    /// Labeler stub returning fixed labels, or failing
    pub(crate) struct StubLabeler {
        pub labels: Option<Vec<Label>>,
        pub calls: AtomicUsize,
    }

    impl StubLabeler {
        pub fn returning(labels: Vec<Label>) -> Self {
            Self {
                labels: Some(labels),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                labels: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ImageLabeler for StubLabeler {
        async fn detect_labels(&self, _image: &[u8]) -> ServiceResult<Vec<Label>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.labels.clone().ok_or_else(|| ServiceError::Api {
                service: "stub",
                message: "quota exceeded".to_string(),
            })
        }
    }

    pub(crate) fn pizza_raw() -> RawNutrition {
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

    fn pipeline(labeler: StubLabeler, source: Arc<StubSource>) -> ResolutionPipeline {
        ResolutionPipeline::new(
            Arc::new(labeler),
            source,
            Arc::new(ServingSizeTable::default()),
        )
    }

    #[tokio::test]
    async fn test_identify_pizza_end_to_end() {
        let source = Arc::new(StubSource::default().with("pizza", pizza_raw()));
        let labeler = StubLabeler::returning(vec![Label::new("pizza", 0.82), Label::new("food", 0.65)]);
        let pipeline = pipeline(labeler, source.clone());

        let record = pipeline.identify(b"jpeg bytes").await.unwrap();

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
        assert_eq!(source.calls(), vec!["pizza"]);
    }

    #[tokio::test]
    async fn test_labeling_failure_is_none() {
        let source = Arc::new(StubSource::default().with("pizza", pizza_raw()));
        let pipeline = pipeline(StubLabeler::failing(), source.clone());

        assert!(pipeline.identify(b"jpeg bytes").await.is_none());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_confident_labels_is_none() {
        let source = Arc::new(StubSource::default().with("pizza", pizza_raw()));
        let labeler = StubLabeler::returning(vec![Label::new("pizza", 0.3)]);
        let pipeline = pipeline(labeler, source.clone());

        assert!(pipeline.identify(b"jpeg bytes").await.is_none());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_custom_serving_size_flows_through() {
        let source = Arc::new(StubSource::default().with("pizza", pizza_raw()));
        let labeler = StubLabeler::returning(vec![Label::new("pizza", 0.9)]);
        let table = ServingSizeTable::default().with_entry("pizza", 200.0);
        let pipeline = ResolutionPipeline::new(Arc::new(labeler), source, Arc::new(table));

        let record = pipeline.identify(b"jpeg bytes").await.unwrap();
        assert_eq!(record.serving_size, 200.0);
        assert_eq!(record.fat, 20.0);
        assert_eq!(record.sodium, 1280);
        assert_eq!(pipeline.serving_sizes().lookup("pizza"), 200.0);
    }
}
