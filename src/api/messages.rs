//! Contact and admission submissions, and the admin inbox.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::{error, success, ApiResult, Deleted};
use crate::models::{
    AdmissionForm, ContactForm, ContactMessage, MarkReadRequest, MessageType, MessageWindow,
};
use crate::AppState;

/// Filters for the admin inbox.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    #[serde(default, rename = "type")]
    pub kind: Option<MessageType>,
    #[serde(default)]
    pub window: MessageWindow,
}

/// POST /api/contact - Submit the contact form.
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> ApiResult<ContactMessage> {
    let revision_id = state.store.revision();

    match form.into_new_message() {
        Ok(message) => {
            let message = state.store.add_contact_message(message).await;
            success(message, state.store.revision())
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/admissions/apply - Submit an admission application.
pub async fn submit_application(
    State(state): State<AppState>,
    Json(form): Json<AdmissionForm>,
) -> ApiResult<ContactMessage> {
    let revision_id = state.store.revision();

    match form.into_new_message() {
        Ok(message) => {
            let message = state.store.add_contact_message(message).await;
            success(message, state.store.revision())
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/admin/messages - Inbox, filtered by type and time window.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<MessageQuery>,
) -> ApiResult<Vec<ContactMessage>> {
    let now = Utc::now();

    let messages: Vec<ContactMessage> = state
        .store
        .read(|c| {
            c.contact_messages
                .iter()
                .filter(|m| params.kind.map_or(true, |kind| m.kind == kind))
                .filter(|m| params.window.contains(m, now))
                .cloned()
                .collect()
        })
        .await;

    success(messages, state.store.revision())
}

/// PUT /api/admin/messages/:id/read - Flag a message read or unread.
pub async fn mark_message_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MarkReadRequest>,
) -> ApiResult<ContactMessage> {
    let revision_id = state.store.revision();

    match state.store.mark_message_read(&id, request.read).await {
        Ok(message) => success(message, state.store.revision()),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/messages/:id - Delete a message.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let deleted = state.store.delete_contact_message(&id).await;
    success(Deleted { deleted }, state.store.revision())
}
