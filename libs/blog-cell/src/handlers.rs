use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BlogError, CreateBlogPostRequest, ListBlogQuery, DEFAULT_LIST_LIMIT};
use crate::services::blog::BlogService;

fn map_blog_error(e: BlogError) -> AppError {
    match e {
        BlogError::NotFound => AppError::NotFound("Blog post not found".to_string()),
        BlogError::ValidationError(msg) => AppError::Validation(msg),
        BlogError::DatabaseError(msg) => AppError::StoreUnavailable(msg),
    }
}

#[axum::debug_handler]
pub async fn create_blog_post(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBlogPostRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() && !user.is_admin() {
        return Err(AppError::Permission(
            "Only doctors and admins may publish posts".to_string(),
        ));
    }
    let author_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Authenticated user id is not a valid identifier".to_string()))?;

    let token = auth.token();
    let blog_service = BlogService::new(&state);

    let post = blog_service
        .create(author_id, &request.title, &request.content, &request.category, token)
        .await
        .map_err(map_blog_error)?;

    Ok(Json(json!({
        "success": true,
        "post": post,
        "message": "Blog post published"
    })))
}

#[axum::debug_handler]
pub async fn list_blog_posts(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ListBlogQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let blog_service = BlogService::new(&state);

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let posts = blog_service
        .list(query.category.as_deref(), limit, token)
        .await
        .map_err(map_blog_error)?;

    Ok(Json(json!({
        "posts": posts,
        "total": posts.len()
    })))
}

#[axum::debug_handler]
pub async fn get_blog_post(
    State(state): State<Arc<AppConfig>>,
    Path(blog_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let blog_service = BlogService::new(&state);

    let post = blog_service
        .read(blog_id, token)
        .await
        .map_err(map_blog_error)?;

    Ok(Json(json!(post)))
}
