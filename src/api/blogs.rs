//! Blog API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{error, rebuild_search_index_async, success, ApiResult, CategoryQuery, Deleted};
use crate::errors::AppError;
use crate::models::{related_posts, BlogPost, CreateBlogRequest, UpdateBlogRequest};
use crate::AppState;

/// Filters for the public blog list.
#[derive(Debug, Default, Deserialize)]
pub struct BlogQuery {
    #[serde(default)]
    pub category: Option<String>,
    /// Substring matched against title and excerpt.
    #[serde(default)]
    pub q: Option<String>,
}

/// GET /api/blogs - Published posts, optionally filtered.
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(params): Query<BlogQuery>,
) -> ApiResult<Vec<BlogPost>> {
    let category = CategoryQuery {
        category: params.category,
    };
    let text = params.q.unwrap_or_default();

    let blogs: Vec<BlogPost> = state
        .store
        .read(|c| {
            c.blogs
                .iter()
                .filter(|b| b.published && category.matches(&b.category))
                .filter(|b| text.trim().is_empty() || b.matches_text(text.trim()))
                .cloned()
                .collect()
        })
        .await;

    success(blogs, state.store.revision())
}

/// GET /api/blogs/:id - A single published post.
pub async fn get_blog(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<BlogPost> {
    let revision_id = state.store.revision();

    let blog = state
        .store
        .read(|c| c.blogs.iter().find(|b| b.id == id && b.published).cloned())
        .await;

    match blog {
        Some(blog) => success(blog, revision_id),
        None => error(
            AppError::NotFound(format!("Blog post {} not found", id)),
            revision_id,
        ),
    }
}

/// GET /api/blogs/:id/related - Other published posts in the same category.
pub async fn related_blogs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<BlogPost>> {
    let revision_id = state.store.revision();

    let related = state
        .store
        .read(|c| {
            let post = c.blogs.iter().find(|b| b.id == id)?;
            Some(
                related_posts(&c.blogs, post)
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        })
        .await;

    match related {
        Some(related) => success(related, revision_id),
        None => error(
            AppError::NotFound(format!("Blog post {} not found", id)),
            revision_id,
        ),
    }
}

/// GET /api/admin/blogs - All posts, drafts included.
pub async fn list_all_blogs(State(state): State<AppState>) -> ApiResult<Vec<BlogPost>> {
    let blogs = state.store.read(|c| c.blogs.clone()).await;
    success(blogs, state.store.revision())
}

/// POST /api/admin/blogs - Create a post.
pub async fn create_blog(
    State(state): State<AppState>,
    Json(request): Json<CreateBlogRequest>,
) -> ApiResult<BlogPost> {
    let revision_id = state.store.revision();

    match state.store.add_blog(request).await {
        Ok(blog) => {
            rebuild_search_index_async(&state).await;
            success(blog, state.store.revision())
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/blogs/:id - Update a post.
pub async fn update_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateBlogRequest>,
) -> ApiResult<BlogPost> {
    let revision_id = state.store.revision();

    match state.store.update_blog(&id, request).await {
        Ok(blog) => {
            rebuild_search_index_async(&state).await;
            success(blog, state.store.revision())
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/blogs/:id - Delete a post.
pub async fn delete_blog(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Deleted> {
    let deleted = state.store.delete_blog(&id).await;
    if deleted {
        rebuild_search_index_async(&state).await;
    }

    success(Deleted { deleted }, state.store.revision())
}
