use axum::Json;
use serde::Serialize;

pub const WELCOME_MESSAGE: &str = "Bienvenue sur l'API de recommandation d'orientation !";

#[derive(Serialize)]
pub struct HomeResponse {
    pub message: &'static str,
}

#[tracing::instrument(name = "GET /")]
pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: WELCOME_MESSAGE,
    })
}
