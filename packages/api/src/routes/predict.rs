use crate::error::ErrorBody;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use recommender_ml::{FeatureRow, PredictionResult, Recommendation};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationBody {
    pub major: String,
    /// Percentage with two decimals, e.g. `"87.00%"`.
    pub confidence: String,
}

impl From<&Recommendation> for RecommendationBody {
    fn from(rec: &Recommendation) -> Self {
        RecommendationBody {
            major: rec.major.clone(),
            confidence: rec.confidence_percent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Success {
        status: &'static str,
        recommendation_1: RecommendationBody,
        recommendation_2: RecommendationBody,
    },
    Error(ErrorBody),
}

impl From<&PredictionResult> for PredictResponse {
    fn from(result: &PredictionResult) -> Self {
        PredictResponse::Success {
            status: "success",
            recommendation_1: (&result.first).into(),
            recommendation_2: (&result.second).into(),
        }
    }
}

/// Score one student's grades.
///
/// The body is a map of column name to grade; columns the model expects
/// but the body lacks are reported back by name. Extra fields are ignored,
/// while an expected column holding a non-number is rejected with 422.
#[tracing::instrument(name = "POST /predict", skip(state, row))]
pub async fn predict(State(state): State<AppState>, Json(row): Json<FeatureRow>) -> Response {
    let invalid = row.non_numeric_columns(&state.predictor.expected_columns());
    if !invalid.is_empty() {
        tracing::warn!("Prediction rejected, non-numeric columns: {:?}", invalid);
        metrics::counter!("predictions_total", "outcome" => "invalid").increment(1);
        let body = ErrorBody {
            error: format!("non-numeric values for columns: {}", invalid.join(", ")),
        };
        return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
    }

    let t0 = Instant::now();
    let response = match state.predictor.predict_row(&row) {
        Ok(result) => {
            tracing::debug!(
                "Recommended {} ({}) then {} ({})",
                result.first.major,
                result.first.confidence_percent(),
                result.second.major,
                result.second.confidence_percent()
            );
            metrics::counter!("predictions_total", "outcome" => "success").increment(1);
            PredictResponse::from(&result)
        }
        Err(err) => {
            metrics::counter!("predictions_total", "outcome" => "error").increment(1);
            PredictResponse::Error(ErrorBody::from(&err))
        }
    };
    metrics::histogram!("prediction_duration_seconds").record(t0.elapsed().as_secs_f64());
    Json(response).into_response()
}
