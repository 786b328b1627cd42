//! Site content, pages and settings endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    BlogPost, MessageType, Notice, PageKey, PublicContent, Settings, SiteContent,
    UpdateCredentialsRequest,
};
use crate::AppState;

/// Recent items shown on the dashboard.
const DASHBOARD_RECENT: usize = 5;

/// Admin dashboard summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_notices: usize,
    pub published_blogs: usize,
    pub gallery_items: usize,
    pub total_messages: usize,
    pub unread_messages: usize,
    pub applications: usize,
    pub recent_notices: Vec<Notice>,
    pub recent_blogs: Vec<BlogPost>,
}

#[derive(Debug, Serialize)]
pub struct CredentialsUpdated {
    pub username: String,
}

/// GET /api/content - Everything the public site renders.
pub async fn get_public_content(State(state): State<AppState>) -> ApiResult<PublicContent> {
    let content = state.store.read(|c| c.public_view()).await;
    success(content, state.store.revision())
}

/// GET /api/settings - Site-wide settings.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Settings> {
    let settings = state.store.read(|c| c.settings.clone()).await;
    success(settings, state.store.revision())
}

/// GET /api/pages/:page - One editable page.
pub async fn get_page(State(state): State<AppState>, Path(page): Path<String>) -> ApiResult<Value> {
    let revision_id = state.store.revision();

    let Some(page) = PageKey::from_name(&page) else {
        return error(
            AppError::NotFound(format!("Page {} not found", page)),
            revision_id,
        );
    };

    let content = state.store.read(|c| c.page(page).clone()).await;
    success(content, revision_id)
}

/// GET /api/admin/content - Full content, including messages.
pub async fn get_admin_content(State(state): State<AppState>) -> ApiResult<SiteContent> {
    let content = state.store.snapshot().await;
    success(content, state.store.revision())
}

/// GET /api/admin/dashboard - Counts and recent activity.
pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = state
        .store
        .read(|c| DashboardStats {
            total_notices: c.notices.len(),
            published_blogs: c.blogs.iter().filter(|b| b.published).count(),
            gallery_items: c.gallery.len(),
            total_messages: c.contact_messages.len(),
            unread_messages: c.contact_messages.iter().filter(|m| !m.read).count(),
            applications: c
                .contact_messages
                .iter()
                .filter(|m| m.kind == MessageType::Admission)
                .count(),
            recent_notices: c.notices.iter().take(DASHBOARD_RECENT).cloned().collect(),
            recent_blogs: c.blogs.iter().take(DASHBOARD_RECENT).cloned().collect(),
        })
        .await;

    success(stats, state.store.revision())
}

/// PUT /api/admin/pages/:page - Replace a page's content.
pub async fn update_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Json(content): Json<Value>,
) -> ApiResult<Value> {
    let revision_id = state.store.revision();

    let Some(page) = PageKey::from_name(&page) else {
        return error(
            AppError::NotFound(format!("Page {} not found", page)),
            revision_id,
        );
    };

    match state.store.update_page(page, content).await {
        Ok(content) => success(content, state.store.revision()),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/settings - Replace site settings.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<Settings>,
) -> ApiResult<Settings> {
    let revision_id = state.store.revision();

    match state.store.update_settings(settings).await {
        Ok(settings) => success(settings, state.store.revision()),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/credentials - Change the admin username and password.
pub async fn update_credentials(
    State(state): State<AppState>,
    Json(request): Json<UpdateCredentialsRequest>,
) -> ApiResult<CredentialsUpdated> {
    let revision_id = state.store.revision();

    match state.store.update_admin_credentials(request).await {
        Ok(username) => {
            tracing::info!(%username, "Admin credentials changed");
            success(CredentialsUpdated { username }, state.store.revision())
        }
        Err(e) => error(e, revision_id),
    }
}
