use axum::{Router, routing::get, routing::post};
use state::AppState;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod error;
mod routes;
pub mod state;

pub use axum;
pub use routes::home::WELCOME_MESSAGE;
pub use routes::predict::{PredictResponse, RecommendationBody};

pub fn construct_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::home::home))
        .route("/predict", post(routes::predict::predict))
        .nest("/health", routes::health::routes())
        .route("/metrics", get(routes::metrics::metrics))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
