use metrics_exporter_prometheus::PrometheusHandle;
use recommender_ml::Predictor;
use std::sync::Arc;

pub type AppState = Arc<State>;

/// Built once at startup and injected into every handler. Read-only.
pub struct State {
    pub predictor: Arc<Predictor>,
    pub metrics: Option<PrometheusHandle>,
}

impl State {
    pub fn new(predictor: Predictor) -> Self {
        State {
            predictor: Arc::new(predictor),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
