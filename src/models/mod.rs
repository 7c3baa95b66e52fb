//! Data models
//!
//! Labels, nutrition records and persisted history rows.

mod history;
mod label;
mod nutrition;

pub use history::{HistoryEntry, HistoryEntryCreate, HistoryStats};
pub use label::Label;
pub use nutrition::{NutritionRecord, RawNutrition};
