use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Routes mounted under `/auth`: registration, login, token validation.
pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/validate", post(handlers::validate_token))
        .with_state(state)
}

/// Routes mounted under `/users`: profile reads and management.
pub fn user_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/me", get(handlers::get_me))
        .route("/doctors", get(handlers::list_doctors))
        .route("/admin/overview", get(handlers::admin_overview))
        .route("/{user_id}", get(handlers::get_user))
        .route("/{user_id}", put(handlers::update_user))
        .route("/{user_id}", delete(handlers::delete_user))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
