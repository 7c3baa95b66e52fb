//! Image label model

use serde::{Deserialize, Serialize};

/// A candidate food identification from the labeling service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    /// Confidence score in [0, 1]
    pub confidence: f64,
}

impl Label {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}
