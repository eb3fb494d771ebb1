use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn history_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{user_id}", get(handlers::list_entries))
        .route("/{user_id}", post(handlers::append_entry))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
