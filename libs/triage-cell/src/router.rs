use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn triage_routes(state: Arc<AppConfig>) -> Router {
    // Every AI pass-through requires authentication
    let protected_routes = Router::new()
        .route("/predict", post(handlers::predict_disease))
        .route("/report", post(handlers::analyze_report))
        .route("/chat", post(handlers::chat))
        .route("/transcribe", post(handlers::transcribe_audio))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
