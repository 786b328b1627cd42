//! Gallery API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, success, ApiResult, CategoryQuery, Deleted};
use crate::models::{CreateGalleryItemRequest, GalleryItem, UpdateGalleryItemRequest};
use crate::AppState;

/// GET /api/gallery - Gallery images, optionally by category.
pub async fn list_gallery(
    State(state): State<AppState>,
    Query(filter): Query<CategoryQuery>,
) -> ApiResult<Vec<GalleryItem>> {
    let items: Vec<GalleryItem> = state
        .store
        .read(|c| {
            c.gallery
                .iter()
                .filter(|g| filter.matches(&g.category))
                .cloned()
                .collect()
        })
        .await;

    success(items, state.store.revision())
}

/// POST /api/admin/gallery - Add an image.
pub async fn create_gallery_item(
    State(state): State<AppState>,
    Json(request): Json<CreateGalleryItemRequest>,
) -> ApiResult<GalleryItem> {
    let revision_id = state.store.revision();

    match state.store.add_gallery_item(request).await {
        Ok(item) => success(item, state.store.revision()),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/gallery/:id - Update an image.
pub async fn update_gallery_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateGalleryItemRequest>,
) -> ApiResult<GalleryItem> {
    let revision_id = state.store.revision();

    match state.store.update_gallery_item(&id, request).await {
        Ok(item) => success(item, state.store.revision()),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/gallery/:id - Remove an image.
pub async fn delete_gallery_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let deleted = state.store.delete_gallery_item(&id).await;
    success(Deleted { deleted }, state.store.revision())
}
