//! Remote mirror status.

use axum::extract::State;
use serde::Serialize;

use super::{success, ApiResult};
use crate::remote::MirrorEntry;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    pub remote_configured: bool,
    pub remote_primary: bool,
    /// Oldest first.
    pub entries: Vec<MirrorEntry>,
}

/// GET /api/admin/sync-log - Outcomes of recent remote writes.
pub async fn get_sync_log(State(state): State<AppState>) -> ApiResult<SyncLog> {
    let log = SyncLog {
        remote_configured: state.store.has_remote(),
        remote_primary: state.store.is_remote_primary(),
        entries: state.store.mirror_log().entries().await,
    };

    success(log, state.store.revision())
}
