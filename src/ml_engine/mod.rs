//! ML Engine for suspect-reading confirmation
//!
//! Threshold checks flag any reading with a channel out of bounds; this
//! module decides which of those are real outliers relative to nominal
//! engine behaviour.
//!
//! ## Architecture
//! - `isolation_forest`: in-crate isolation forest (seeded tree growth,
//!   bounding-box early termination, normalized path-length score)
//! - `classifier`: `AnomalyClassifier` trait plus `OutlierClassifier`, which
//!   trains the forest on synthetic nominal data and fixes the decision
//!   threshold from the training scores (statrs order statistics)

pub mod classifier;
pub mod isolation_forest;

// Re-export public types
pub use classifier::{AnomalyClassifier, OutlierClassifier};
pub use isolation_forest::{average_path_length, IsolationForest, TrainingError};
