use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// How many posts a listing returns when the caller does not say.
pub const DEFAULT_LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub category: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub views: i64,
}

/// A post decorated with its author's display name for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedBlogPost {
    #[serde(flatten)]
    pub post: BlogPost,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlogPostRequest {
    pub title: String,
    pub content: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListBlogQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Error, Debug)]
pub enum BlogError {
    #[error("Blog post not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
