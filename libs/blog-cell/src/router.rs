use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn blog_routes(state: Arc<AppConfig>) -> Router {
    // Reading and publishing both sit behind login
    let protected_routes = Router::new()
        .route("/", post(handlers::create_blog_post))
        .route("/", get(handlers::list_blog_posts))
        .route("/{blog_id}", get(handlers::get_blog_post))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
