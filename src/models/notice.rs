//! Notice board model.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A notice shown on the notices page.
///
/// `is_latest` is a single-winner flag across the whole list. It is only
/// changed through the store's set-latest operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub is_latest: bool,
    #[serde(default)]
    pub is_pinned: bool,
}

/// Request body for creating a notice.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoticeRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub is_pinned: bool,
    /// Make the new notice the latest one, clearing the flag elsewhere.
    #[serde(default)]
    pub is_latest: bool,
}

fn default_category() -> String {
    "General".to_string()
}

impl CreateNoticeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Notice title is required".to_string()));
        }
        Ok(())
    }
}

/// Request body for updating a notice. Carries no `isLatest` field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoticeRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub is_pinned: Option<bool>,
}

impl Notice {
    /// Merge the present fields of an update into this notice.
    pub fn apply(&mut self, update: UpdateNoticeRequest) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(is_pinned) = update.is_pinned {
            self.is_pinned = is_pinned;
        }
    }
}

/// Set the latest flag on `id` and clear it everywhere else.
///
/// Returns the ids whose flag changed, or `None` when `id` is not in the list
/// (in which case nothing is touched).
pub fn mark_latest(notices: &mut [Notice], id: &str) -> Option<Vec<String>> {
    if !notices.iter().any(|n| n.id == id) {
        return None;
    }

    let mut changed = Vec::new();
    for notice in notices.iter_mut() {
        let latest = notice.id == id;
        if notice.is_latest != latest {
            notice.is_latest = latest;
            changed.push(notice.id.clone());
        }
    }
    Some(changed)
}
