use axum::{
    Json,
    response::{IntoResponse, Response},
};
use recommender_ml::PredictError;
use serde::Serialize;

/// Error payload of the predict endpoint.
///
/// Always sent with status 200; callers detect failure by the `error` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&PredictError> for ErrorBody {
    fn from(err: &PredictError) -> Self {
        match err {
            PredictError::ModelNotLoaded => tracing::warn!("Prediction requested without a model"),
            PredictError::MissingColumns(columns) => {
                tracing::warn!("Prediction rejected, missing columns: {:?}", columns)
            }
            PredictError::Scoring(failure) => tracing::error!("Prediction failed: {}", failure),
        }
        ErrorBody {
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
