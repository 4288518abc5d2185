//! Immutable scoring service: reindex, score, rank, keep the top two.

use crate::grades::{FEATURE_COLUMNS, FeatureRow, StudentGrades};
use crate::model::{ArtifactError, TrainedModel};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use thiserror::Error;

/// Why scoring a well-formed row failed. Carries no internal diagnostic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScoringFailure {
    #[error("model failed to score the input")]
    ModelFailure,
    #[error("probability and class label counts differ")]
    LengthMismatch,
    #[error("model produced a non-finite probability")]
    NonFiniteProbability,
    #[error("model knows fewer than two classes")]
    TooFewClasses,
}

/// The display strings are the exact payloads returned to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictError {
    #[error("Modèle non chargé.")]
    ModelNotLoaded,
    #[error("Colonnes manquantes : {}", column_set(.0))]
    MissingColumns(Vec<String>),
    #[error("Erreur interne : {0}")]
    Scoring(ScoringFailure),
}

fn column_set(columns: &[String]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| format!("'{c}'")).collect();
    format!("{{{}}}", quoted.join(", "))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub major: String,
    /// Probability mass in `[0, 1]`.
    pub confidence: f64,
}

impl Recommendation {
    /// Confidence as a percentage with two decimals, e.g. `"87.00%"`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub first: Recommendation,
    pub second: Recommendation,
}

/// Pair labels with probabilities and keep the two most likely.
///
/// Sorted by descending probability; equal probabilities keep the
/// classifier's class order (lower index first).
pub fn rank_top_two(
    labels: &[String],
    probabilities: &[f64],
) -> Result<PredictionResult, ScoringFailure> {
    if labels.len() != probabilities.len() {
        return Err(ScoringFailure::LengthMismatch);
    }
    if probabilities.iter().any(|p| !p.is_finite()) {
        return Err(ScoringFailure::NonFiniteProbability);
    }
    if labels.len() < 2 {
        return Err(ScoringFailure::TooFewClasses);
    }

    let mut ranked: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
        Some(Ordering::Equal) | None => a.0.cmp(&b.0),
        Some(order) => order,
    });

    let pick = |(idx, confidence): (usize, f64)| Recommendation {
        major: labels[idx].clone(),
        confidence,
    };
    Ok(PredictionResult {
        first: pick(ranked[0]),
        second: pick(ranked[1]),
    })
}

/// Holds the model loaded at startup, or nothing if loading failed.
///
/// Never mutated after construction, so it is shared across request
/// handlers behind an `Arc` without locking.
#[derive(Debug, Default)]
pub struct Predictor {
    model: Option<TrainedModel>,
}

impl Predictor {
    pub fn new(model: TrainedModel) -> Self {
        Predictor { model: Some(model) }
    }

    pub fn unloaded() -> Self {
        Predictor { model: None }
    }

    /// Load the artifact at `path`. A missing or unreadable artifact is
    /// logged and yields an unloaded predictor.
    pub fn load_or_unloaded(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match TrainedModel::load(path) {
            Ok(model) => {
                tracing::info!("Model loaded from {}", path.display());
                match model.feature_names() {
                    Some(names) => tracing::info!("Expected column order: {:?}", names),
                    None => tracing::info!("Model carries no feature names, using default order"),
                }
                Predictor::new(model)
            }
            Err(ArtifactError::NotFound(path)) => {
                tracing::error!("Model file not found: {}", path);
                Predictor::unloaded()
            }
            Err(err) => {
                tracing::error!("Failed to load model: {}", err);
                Predictor::unloaded()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Column order rows are reindexed to before scoring.
    pub fn expected_columns(&self) -> Vec<String> {
        match self.model.as_ref().and_then(TrainedModel::feature_names) {
            Some(names) => names.to_vec(),
            None => FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn predict(&self, grades: &StudentGrades) -> Result<PredictionResult, PredictError> {
        self.predict_row(&grades.to_row())
    }

    pub fn predict_row(&self, row: &FeatureRow) -> Result<PredictionResult, PredictError> {
        let model = self.model.as_ref().ok_or(PredictError::ModelNotLoaded)?;

        let expected = self.expected_columns();
        let missing = row.missing_columns(&expected);
        if !missing.is_empty() {
            return Err(PredictError::MissingColumns(missing));
        }
        let features = row
            .reindex(&expected)
            .ok_or_else(|| PredictError::MissingColumns(row.missing_columns(&expected)))?;

        let probabilities = model.forest().predict_proba_one(&features).map_err(|err| {
            tracing::error!("Scoring failed: {:#}", err);
            PredictError::Scoring(ScoringFailure::ModelFailure)
        })?;

        rank_top_two(model.classes(), &probabilities).map_err(|failure| {
            tracing::error!("Ranking failed: {}", failure);
            PredictError::Scoring(failure)
        })
    }
}
