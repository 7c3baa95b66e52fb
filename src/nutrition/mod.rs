//! Food identification
//!
//! Serving sizes, per-serving normalization, label resolution and the
//! pipeline that ties them to the external services.

pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod serving;

pub use normalizer::{normalize, round_to};
pub use pipeline::ResolutionPipeline;
pub use resolver::{candidate_labels, resolve, CONFIDENCE_THRESHOLD};
pub use serving::{
    parse_serving_overrides, ServingSizeError, ServingSizeTable, COMMON_SERVING_SIZES,
    DEFAULT_SERVING_GRAMS,
};
