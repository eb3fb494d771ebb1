use std::collections::HashMap;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use directory_cell::services::directory::DirectoryService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BlogPost, BlogError, EnrichedBlogPost};

/// Blog posts are written once and then only accumulate views. Author names
/// are joined in at read time for presentation.
pub struct BlogService {
    supabase: SupabaseClient,
    directory: DirectoryService,
}

impl BlogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
        }
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        title: &str,
        content: &str,
        category: &str,
        auth_token: &str,
    ) -> Result<BlogPost, BlogError> {
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(BlogError::ValidationError(
                "Title and content are required".to_string(),
            ));
        }

        debug!("Creating blog post '{}' by {}", title.trim(), author_id);

        let post_data = json!({
            "id": Uuid::new_v4(),
            "title": title.trim(),
            "content": content.trim(),
            "author_id": author_id,
            "category": category.trim(),
            "created_at": Utc::now().to_rfc3339(),
            "views": 0,
        });

        let created = self
            .supabase
            .insert_returning("/rest/v1/blogs", Some(auth_token), post_data)
            .await
            .map_err(|e| BlogError::DatabaseError(e.to_string()))?;

        let row = created.into_iter().next().ok_or_else(|| {
            BlogError::DatabaseError("Store returned no row for created post".to_string())
        })?;

        serde_json::from_value(row).map_err(|e| BlogError::DatabaseError(e.to_string()))
    }

    pub async fn list(
        &self,
        category: Option<&str>,
        limit: usize,
        auth_token: &str,
    ) -> Result<Vec<EnrichedBlogPost>, BlogError> {
        let mut path = format!("/rest/v1/blogs?order=created_at.desc&limit={}", limit);
        if let Some(category) = category {
            path.push_str(&format!("&category=eq.{}", urlencoding::encode(category)));
        }

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BlogError::DatabaseError(e.to_string()))?;

        let posts = rows
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| BlogError::DatabaseError(e.to_string()))
            })
            .collect::<Result<Vec<BlogPost>, _>>()?;

        let authors = self.resolve_authors(&posts, auth_token).await;

        Ok(posts
            .into_iter()
            .map(|post| {
                let author_name = authors.get(&post.author_id).cloned();
                EnrichedBlogPost { post, author_name }
            })
            .collect())
    }

    /// Single-post read. Each read bumps the view counter; the bump is plain
    /// read-then-write and a failed bump never blocks the read itself.
    pub async fn read(
        &self,
        blog_id: Uuid,
        auth_token: &str,
    ) -> Result<EnrichedBlogPost, BlogError> {
        let path = format!("/rest/v1/blogs?id=eq.{}", blog_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BlogError::DatabaseError(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(BlogError::NotFound)?;
        let mut post: BlogPost =
            serde_json::from_value(row).map_err(|e| BlogError::DatabaseError(e.to_string()))?;

        let update_path = format!("/rest/v1/blogs?id=eq.{}", blog_id);
        match self
            .supabase
            .update_returning(&update_path, Some(auth_token), json!({"views": post.views + 1}))
            .await
        {
            Ok(updated) => {
                if let Some(updated_row) = updated.into_iter().next() {
                    if let Ok(updated_post) = serde_json::from_value::<BlogPost>(updated_row) {
                        post = updated_post;
                    }
                }
            }
            Err(e) => warn!("View counter bump for post {} failed: {}", blog_id, e),
        }

        let author_name = self
            .resolve_authors(std::slice::from_ref(&post), auth_token)
            .await
            .get(&post.author_id)
            .cloned();

        Ok(EnrichedBlogPost { post, author_name })
    }

    async fn resolve_authors(
        &self,
        posts: &[BlogPost],
        auth_token: &str,
    ) -> HashMap<Uuid, String> {
        let mut authors = HashMap::new();

        for post in posts {
            if authors.contains_key(&post.author_id) {
                continue;
            }
            match self
                .directory
                .find_by_id(&post.author_id.to_string(), Some(auth_token))
                .await
            {
                Ok(profile) => {
                    authors.insert(post.author_id, profile.username);
                }
                // Display enrichment only; the post still lists without a
                // resolved author name.
                Err(e) => warn!("Could not resolve author {}: {}", post.author_id, e),
            }
        }

        authors
    }
}
