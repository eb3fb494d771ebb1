use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use blog_cell::router::blog_routes;
use directory_cell::router::{auth_routes, user_routes};
use history_cell::router::history_routes;
use shared_config::AppConfig;
use triage_cell::router::triage_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "MedAI Portal API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/history", history_routes(state.clone()))
        .nest("/triage", triage_routes(state.clone()))
        .nest("/blogs", blog_routes(state.clone()))
}
