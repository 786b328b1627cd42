//! Notice API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, rebuild_search_index_async, success, ApiResult, CategoryQuery, Deleted};
use crate::models::{CreateNoticeRequest, Notice, UpdateNoticeRequest};
use crate::AppState;

/// GET /api/notices - List notices, optionally by category.
pub async fn list_notices(
    State(state): State<AppState>,
    Query(filter): Query<CategoryQuery>,
) -> ApiResult<Vec<Notice>> {
    let notices: Vec<Notice> = state
        .store
        .read(|c| {
            c.notices
                .iter()
                .filter(|n| filter.matches(&n.category))
                .cloned()
                .collect()
        })
        .await;

    success(notices, state.store.revision())
}

/// GET /api/notices/latest - The notice shown in the pop-up, if any.
pub async fn latest_notice(State(state): State<AppState>) -> ApiResult<Option<Notice>> {
    let notice = state
        .store
        .read(|c| c.notices.iter().find(|n| n.is_latest).cloned())
        .await;

    success(notice, state.store.revision())
}

/// POST /api/admin/notices - Create a notice.
pub async fn create_notice(
    State(state): State<AppState>,
    Json(request): Json<CreateNoticeRequest>,
) -> ApiResult<Notice> {
    let revision_id = state.store.revision();

    match state.store.add_notice(request).await {
        Ok(notice) => {
            rebuild_search_index_async(&state).await;
            success(notice, state.store.revision())
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/notices/:id - Update a notice.
pub async fn update_notice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateNoticeRequest>,
) -> ApiResult<Notice> {
    let revision_id = state.store.revision();

    match state.store.update_notice(&id, request).await {
        Ok(notice) => {
            rebuild_search_index_async(&state).await;
            success(notice, state.store.revision())
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/notices/:id - Delete a notice.
pub async fn delete_notice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let deleted = state.store.delete_notice(&id).await;
    if deleted {
        rebuild_search_index_async(&state).await;
    }

    success(Deleted { deleted }, state.store.revision())
}

/// PUT /api/admin/notices/:id/latest - Make a notice the only latest one.
pub async fn set_latest_notice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Notice> {
    let revision_id = state.store.revision();

    match state.store.set_latest_notice(&id).await {
        Ok(notice) => success(notice, state.store.revision()),
        Err(e) => error(e, revision_id),
    }
}
