#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use recommender_api::{construct_router, state::State};
use recommender_ml::Predictor;
use std::sync::Arc;

mod config;
mod telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    telemetry::init_tracing();

    tracing::info!("Starting Student Recommendation API");

    let config = config::Config::from_env()?;
    tracing::info!("Loaded configuration: model_path={}", config.model_path.display());

    let predictor = Predictor::load_or_unloaded(&config.model_path);
    if !predictor.is_loaded() {
        tracing::warn!("Serving without a model, /predict will return errors");
    }

    let mut state = State::new(predictor);
    match telemetry::init_metrics() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(err) => tracing::warn!("Prometheus metrics disabled: {}", err),
    }

    let app = construct_router(Arc::new(state));

    let addr = config.bind_addr();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
