//! Blog and FAQ endpoints.

use axum::extract::Path;

use super::{success, ApiResult};
use crate::content::{self, BlogPost, BlogPostSummary, FaqEntry};
use crate::errors::AppError;

/// GET /api/blog - Post summaries, as listed on the blog page.
pub async fn list_posts() -> ApiResult<Vec<BlogPostSummary>> {
    success(content::BLOG_POSTS.iter().map(BlogPostSummary::from).collect())
}

/// GET /api/blog/:slug
pub async fn get_post(Path(slug): Path<String>) -> ApiResult<&'static BlogPost> {
    match content::find_post(&slug) {
        Some(post) => success(post),
        None => Err(AppError::NotFound(format!("Post {} not found", slug))),
    }
}

/// GET /api/faq
pub async fn list_faq() -> ApiResult<&'static [FaqEntry]> {
    success(&content::FAQ[..])
}
