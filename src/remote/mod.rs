//! Remote document store.
//!
//! When configured, the store mirrors every mutation to one collection per
//! content kind. Documents use the same ids as the local lists.

mod http;
mod mirror;

pub use http::*;
pub use mirror::*;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;

/// Remote collections, one per content kind.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Notices,
    Blogs,
    Gallery,
    Pages,
    Settings,
    Messages,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Notices => "notices",
            Collection::Blogs => "blogs",
            Collection::Gallery => "gallery",
            Collection::Pages => "pages",
            Collection::Settings => "settings",
            Collection::Messages => "messages",
        }
    }
}

/// Id of the settings document in the settings collection.
pub const SETTINGS_DOCUMENT_ID: &str = "site";

/// Access to a hosted document store and its sign-in endpoint.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Fetch every document in a collection.
    async fn fetch_collection(&self, collection: Collection) -> Result<Vec<Value>, AppError>;

    /// Create or replace the document with `id`.
    async fn upsert_document(
        &self,
        collection: Collection,
        id: &str,
        document: &Value,
    ) -> Result<(), AppError>;

    /// Delete the document with `id`. Deleting a missing document succeeds.
    async fn delete_document(&self, collection: Collection, id: &str) -> Result<(), AppError>;

    /// Check the admin identity. `Ok(false)` means rejected credentials.
    async fn sign_in(&self, username: &str, password: &str) -> Result<bool, AppError>;
}

/// Wrap page or settings content as a `{id, content}` document.
pub fn wrap_document(id: &str, content: &Value) -> Value {
    serde_json::json!({ "id": id, "content": content })
}
