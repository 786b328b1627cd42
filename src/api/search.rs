//! Search API endpoints.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::search::{SearchKind, MAX_SEARCH_LIMIT, MAX_SEARCH_OFFSET};
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    #[serde(default)]
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search results with metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search hit with the full record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub kind: SearchKind,
    pub record: Value,
    pub score: f32,
}

/// GET /api/search - Search published posts and notices.
pub async fn search_content(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let revision_id = state.store.revision();
    let limit = params.limit.min(MAX_SEARCH_LIMIT);

    if params.offset > MAX_SEARCH_OFFSET {
        return error(
            AppError::Validation(format!("offset must be at most {}", MAX_SEARCH_OFFSET)),
            revision_id,
        );
    }

    let hits = match state.search.search(&params.q, limit, params.offset) {
        Ok(hits) => hits,
        Err(e) => return error(e, revision_id),
    };

    // Hits whose record has since gone (or been unpublished) are dropped
    let results: Vec<SearchResultItem> = state
        .store
        .read(|c| {
            hits.into_iter()
                .filter_map(|hit| {
                    let record = match hit.kind {
                        SearchKind::Blog => c
                            .blogs
                            .iter()
                            .find(|b| b.id == hit.id && b.published)
                            .and_then(|b| serde_json::to_value(b).ok()),
                        SearchKind::Notice => c
                            .notices
                            .iter()
                            .find(|n| n.id == hit.id)
                            .and_then(|n| serde_json::to_value(n).ok()),
                    }?;
                    Some(SearchResultItem {
                        kind: hit.kind,
                        record,
                        score: hit.score,
                    })
                })
                .collect()
        })
        .await;

    let total = results.len();

    success(
        SearchResponse {
            results,
            total,
            limit,
            offset: params.offset,
        },
        revision_id,
    )
}
