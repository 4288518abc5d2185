//! Student major recommender
//!
//! Trains a random forest over six subject grades and ranks the most likely
//! academic programs for a student. Trees come from the `[linfa_trees]` crate.

pub mod dataset;
pub mod forest;
pub mod grades;
pub mod metrics;
pub mod model;
pub mod predictor;
pub mod train;

#[cfg(test)]
mod test_support;

pub use dataset::{Dataset, DatasetError, StudentRecord};
pub use forest::{MaxFeatures, RandomForest, RandomForestParams};
pub use grades::{FEATURE_COLUMNS, FeatureRow, LABEL_COLUMN, StudentGrades};
pub use metrics::{AveragedMetrics, ClassMetrics, ClassificationReport};
pub use model::{ArtifactError, DEFAULT_MODEL_PATH, MODEL_FILE_EXTENSION, TrainedModel};
pub use predictor::{
    PredictError, PredictionResult, Predictor, Recommendation, ScoringFailure, rank_top_two,
};
pub use train::{TrainingOptions, TrainingOutcome, evaluate, train};
