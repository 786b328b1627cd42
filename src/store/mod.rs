//! Content store façade.
//!
//! Holds the site content in memory and is the only way to change it. Every
//! mutation runs in two phases:
//!
//! 1. Under the write lock: compute the new state and write the snapshot to
//!    local durable storage (skipped when the remote store is primary).
//! 2. After the lock is released: hand the changed documents to the remote
//!    mirror, which replicates them in order on a background worker.
//!
//! Phase 2 never gates or reverses phase 1.

mod snapshot;

pub use snapshot::*;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::auth::constant_time_compare;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    mark_latest, validate_icons, BlogPost, ContactMessage, CreateBlogRequest,
    CreateGalleryItemRequest, CreateNoticeRequest, GalleryItem, NewMessage, Notice, PageKey,
    Settings, SiteContent, UpdateBlogRequest, UpdateCredentialsRequest, UpdateGalleryItemRequest,
    UpdateNoticeRequest,
};
use crate::remote::{
    wrap_document, Collection, Mirror, MirrorLog, MirrorOp, RemoteBackend, SETTINGS_DOCUMENT_ID,
};

/// List collections and the content key each one overlays.
const LIST_COLLECTIONS: [(Collection, &str); 4] = [
    (Collection::Notices, "notices"),
    (Collection::Blogs, "blogs"),
    (Collection::Gallery, "gallery"),
    (Collection::Messages, "contactMessages"),
];

/// Single source of truth for site content.
pub struct ContentStore {
    content: RwLock<SiteContent>,
    repo: Repository,
    storage_key: String,
    remote: Option<Arc<dyn RemoteBackend>>,
    mirror: Option<Mirror>,
    mirror_log: Arc<MirrorLog>,
    remote_primary: AtomicBool,
    loading: AtomicBool,
    revision: AtomicI64,
}

impl ContentStore {
    /// Create a store holding the default content. It reports loading until
    /// [`initialize`] has run. With a remote, this starts the mirror worker
    /// and so needs a tokio runtime.
    ///
    /// [`initialize`]: ContentStore::initialize
    pub fn new(
        repo: Repository,
        storage_key: impl Into<String>,
        remote: Option<Arc<dyn RemoteBackend>>,
    ) -> Self {
        let mirror_log = Arc::new(MirrorLog::new());
        let mirror = remote
            .as_ref()
            .map(|r| Mirror::new(r.clone(), mirror_log.clone()));

        Self {
            content: RwLock::new(default_content()),
            repo,
            storage_key: storage_key.into(),
            remote,
            mirror,
            mirror_log,
            remote_primary: AtomicBool::new(false),
            loading: AtomicBool::new(true),
            revision: AtomicI64::new(0),
        }
    }

    /// Create and initialize a store.
    pub async fn open(
        repo: Repository,
        storage_key: impl Into<String>,
        remote: Option<Arc<dyn RemoteBackend>>,
    ) -> Self {
        let store = Self::new(repo, storage_key, remote);
        store.initialize().await;
        store
    }

    /// Load content from the remote store when configured, otherwise (or when
    /// the remote fetch fails) from local durable storage.
    pub async fn initialize(&self) {
        self.loading.store(true, Ordering::SeqCst);

        let revision = self.repo.get_revision_id().await.unwrap_or(0);
        self.revision.store(revision, Ordering::SeqCst);

        let mut loaded = None;
        if let Some(remote) = &self.remote {
            match load_remote(remote.as_ref()).await {
                Ok(content) => {
                    tracing::info!("Loaded content from remote store");
                    self.remote_primary.store(true, Ordering::SeqCst);
                    loaded = Some(content);
                }
                Err(e) => {
                    tracing::warn!("Remote fetch failed, falling back to local storage: {}", e);
                    self.remote_primary.store(false, Ordering::SeqCst);
                }
            }
        }

        let mut content = match loaded {
            Some(content) => content,
            None => self.load_local().await,
        };

        if repair_latest(&mut content) {
            tracing::warn!("Several notices were marked latest; kept the first");
        }

        let mut guard = self.content.write().await;
        *guard = content;
        if !self.is_remote_primary() {
            self.persist(&guard).await;
        }
        drop(guard);

        self.loading.store(false, Ordering::SeqCst);
    }

    async fn load_local(&self) -> SiteContent {
        match self.repo.load_snapshot(&self.storage_key).await {
            Ok(Some(raw)) => match restore(&raw, IconPolicy::ResetPage) {
                Ok(content) => {
                    tracing::info!("Loaded content snapshot '{}'", self.storage_key);
                    content
                }
                Err(e) => {
                    tracing::error!("Error parsing saved data: {}", e);
                    default_content()
                }
            },
            Ok(None) => {
                tracing::info!("No saved content; starting from defaults");
                default_content()
            }
            Err(e) => {
                tracing::error!("Error reading saved data: {}", e);
                default_content()
            }
        }
    }

    /// Write the snapshot locally. Failures are logged, never returned.
    async fn persist(&self, content: &SiteContent) {
        if self.is_remote_primary() {
            self.revision.fetch_add(1, Ordering::SeqCst);
            return;
        }

        let raw = match serde_json::to_string(content) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Error serializing content: {}", e);
                return;
            }
        };

        match self.repo.save_snapshot(&self.storage_key, &raw).await {
            Ok(revision) => {
                self.revision.store(revision, Ordering::SeqCst);
                tracing::debug!(revision, "Content saved to local storage");
            }
            Err(e) => {
                self.revision.fetch_add(1, Ordering::SeqCst);
                tracing::error!("Error saving to local storage: {}", e);
            }
        }
    }

    /// Hand documents to the remote mirror, if there is one.
    fn replicate(&self, ops: impl FnOnce() -> Vec<MirrorOp>) {
        if let Some(mirror) = &self.mirror {
            mirror.dispatch(ops());
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Whether the remote store is the primary copy for this session.
    pub fn is_remote_primary(&self) -> bool {
        self.remote_primary.load(Ordering::SeqCst)
    }

    /// Revision of the latest state transition.
    pub fn revision(&self) -> i64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub fn mirror_log(&self) -> &Arc<MirrorLog> {
        &self.mirror_log
    }

    /// Run `f` against the current content.
    pub async fn read<R>(&self, f: impl FnOnce(&SiteContent) -> R) -> R {
        let content = self.content.read().await;
        f(&content)
    }

    /// A copy of the current content.
    pub async fn snapshot(&self) -> SiteContent {
        self.content.read().await.clone()
    }

    // ==================== NOTICES ====================

    pub async fn add_notice(&self, request: CreateNoticeRequest) -> Result<Notice, AppError> {
        request.validate()?;

        let mut content = self.content.write().await;
        let id = generate_id(content.notices.iter().map(|n| n.id.as_str()));
        content.notices.insert(
            0,
            Notice {
                id: id.clone(),
                title: request.title,
                content: request.content,
                category: request.category,
                date: Utc::now().to_rfc3339(),
                is_latest: false,
                is_pinned: request.is_pinned,
            },
        );

        let changed = if request.is_latest {
            mark_latest(&mut content.notices, &id).unwrap_or_default()
        } else {
            vec![id.clone()]
        };
        let notice = content.notices[0].clone();
        self.persist(&content).await;

        let ops = notice_ops(&content.notices, &changed);
        drop(content);
        self.replicate(|| ops);

        Ok(notice)
    }

    pub async fn update_notice(
        &self,
        id: &str,
        request: UpdateNoticeRequest,
    ) -> Result<Notice, AppError> {
        let mut content = self.content.write().await;
        let notice = content
            .notices
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Notice {} not found", id)))?;
        notice.apply(request);
        let notice = notice.clone();
        self.persist(&content).await;
        drop(content);

        self.replicate(|| upsert_op(Collection::Notices, &notice.id, &notice));
        Ok(notice)
    }

    /// Remove a notice. Returns whether it existed.
    pub async fn delete_notice(&self, id: &str) -> bool {
        let mut content = self.content.write().await;
        let before = content.notices.len();
        content.notices.retain(|n| n.id != id);
        if content.notices.len() == before {
            return false;
        }
        self.persist(&content).await;
        drop(content);

        self.replicate(|| vec![MirrorOp::delete(Collection::Notices, id)]);
        true
    }

    /// Make `id` the only notice flagged latest.
    pub async fn set_latest_notice(&self, id: &str) -> Result<Notice, AppError> {
        let mut content = self.content.write().await;
        let changed = mark_latest(&mut content.notices, id)
            .ok_or_else(|| AppError::NotFound(format!("Notice {} not found", id)))?;
        let notice = content
            .notices
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Notice {} not found", id)))?;

        if changed.is_empty() {
            return Ok(notice);
        }
        self.persist(&content).await;
        let ops = notice_ops(&content.notices, &changed);
        drop(content);

        self.replicate(|| ops);
        Ok(notice)
    }

    // ==================== BLOGS ====================

    pub async fn add_blog(&self, request: CreateBlogRequest) -> Result<BlogPost, AppError> {
        request.validate()?;

        let mut content = self.content.write().await;
        let blog = BlogPost {
            id: generate_id(content.blogs.iter().map(|b| b.id.as_str())),
            title: request.title,
            excerpt: request.excerpt,
            content: request.content,
            image: request.image,
            author: request.author,
            category: request.category,
            date: Utc::now().to_rfc3339(),
            published: request.published,
            comments: Vec::new(),
        };
        content.blogs.insert(0, blog.clone());
        self.persist(&content).await;
        drop(content);

        self.replicate(|| upsert_op(Collection::Blogs, &blog.id, &blog));
        Ok(blog)
    }

    pub async fn update_blog(
        &self,
        id: &str,
        request: UpdateBlogRequest,
    ) -> Result<BlogPost, AppError> {
        let mut content = self.content.write().await;
        let blog = content
            .blogs
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Blog post {} not found", id)))?;
        blog.apply(request);
        let blog = blog.clone();
        self.persist(&content).await;
        drop(content);

        self.replicate(|| upsert_op(Collection::Blogs, &blog.id, &blog));
        Ok(blog)
    }

    pub async fn delete_blog(&self, id: &str) -> bool {
        let mut content = self.content.write().await;
        let before = content.blogs.len();
        content.blogs.retain(|b| b.id != id);
        if content.blogs.len() == before {
            return false;
        }
        self.persist(&content).await;
        drop(content);

        self.replicate(|| vec![MirrorOp::delete(Collection::Blogs, id)]);
        true
    }

    // ==================== GALLERY ====================

    pub async fn add_gallery_item(
        &self,
        request: CreateGalleryItemRequest,
    ) -> Result<GalleryItem, AppError> {
        request.validate()?;

        let mut content = self.content.write().await;
        let item = GalleryItem {
            id: generate_id(content.gallery.iter().map(|g| g.id.as_str())),
            title: request.title,
            image: request.image,
            category: request.category,
        };
        content.gallery.insert(0, item.clone());
        self.persist(&content).await;
        drop(content);

        self.replicate(|| upsert_op(Collection::Gallery, &item.id, &item));
        Ok(item)
    }

    pub async fn update_gallery_item(
        &self,
        id: &str,
        request: UpdateGalleryItemRequest,
    ) -> Result<GalleryItem, AppError> {
        let mut content = self.content.write().await;
        let item = content
            .gallery
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Gallery image {} not found", id)))?;
        item.apply(request);
        let item = item.clone();
        self.persist(&content).await;
        drop(content);

        self.replicate(|| upsert_op(Collection::Gallery, &item.id, &item));
        Ok(item)
    }

    pub async fn delete_gallery_item(&self, id: &str) -> bool {
        let mut content = self.content.write().await;
        let before = content.gallery.len();
        content.gallery.retain(|g| g.id != id);
        if content.gallery.len() == before {
            return false;
        }
        self.persist(&content).await;
        drop(content);

        self.replicate(|| vec![MirrorOp::delete(Collection::Gallery, id)]);
        true
    }

    // ==================== PAGES & SETTINGS ====================

    /// Replace a page's content. Unknown icon names are rejected.
    pub async fn update_page(&self, page: PageKey, new_content: Value) -> Result<Value, AppError> {
        if !new_content.is_object() {
            return Err(AppError::Validation(format!(
                "Content for '{}' must be an object",
                page.as_str()
            )));
        }
        validate_icons(page.as_str(), &new_content)?;

        let mut content = self.content.write().await;
        *content.page_mut(page) = new_content.clone();
        self.persist(&content).await;
        drop(content);

        self.replicate(|| {
            vec![MirrorOp::upsert(
                Collection::Pages,
                page.as_str(),
                wrap_document(page.as_str(), &new_content),
            )]
        });
        Ok(new_content)
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<Settings, AppError> {
        settings.validate()?;

        let mut content = self.content.write().await;
        content.settings = settings.clone();
        self.persist(&content).await;
        drop(content);

        self.replicate(|| settings_ops(&settings));
        Ok(settings)
    }

    /// Change the admin credentials. Returns the resulting username.
    ///
    /// Credentials stay local. While the remote store is primary, logins go
    /// through its sign-in, so a change here is refused.
    pub async fn update_admin_credentials(
        &self,
        request: UpdateCredentialsRequest,
    ) -> Result<String, AppError> {
        if self.is_remote_primary() {
            return Err(AppError::BadRequest(
                "Credentials are managed by the remote identity provider".to_string(),
            ));
        }
        request.validate()?;

        let mut content = self.content.write().await;
        content.admin.apply(request);
        let username = content.admin.username.clone();
        self.persist(&content).await;

        Ok(username)
    }

    // ==================== MESSAGES ====================

    pub async fn add_contact_message(&self, message: NewMessage) -> ContactMessage {
        let mut content = self.content.write().await;
        let message = ContactMessage {
            id: generate_id(content.contact_messages.iter().map(|m| m.id.as_str())),
            kind: message.kind,
            submitted_at: message.submitted_at,
            date: Utc::now().to_rfc3339(),
            read: false,
            fields: message.fields,
        };
        tracing::info!(id = %message.id, kind = ?message.kind, "Adding contact message");
        content.contact_messages.insert(0, message.clone());
        self.persist(&content).await;
        drop(content);

        self.replicate(|| upsert_op(Collection::Messages, &message.id, &message));
        message
    }

    pub async fn mark_message_read(&self, id: &str, read: bool) -> Result<ContactMessage, AppError> {
        let mut content = self.content.write().await;
        let message = content
            .contact_messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;
        message.read = read;
        let message = message.clone();
        self.persist(&content).await;
        drop(content);

        self.replicate(|| upsert_op(Collection::Messages, &message.id, &message));
        Ok(message)
    }

    pub async fn delete_contact_message(&self, id: &str) -> bool {
        let mut content = self.content.write().await;
        let before = content.contact_messages.len();
        content.contact_messages.retain(|m| m.id != id);
        if content.contact_messages.len() == before {
            return false;
        }
        tracing::info!(id, "Deleted contact message");
        self.persist(&content).await;
        drop(content);

        self.replicate(|| vec![MirrorOp::delete(Collection::Messages, id)]);
        true
    }

    // ==================== AUTH ====================

    /// Check admin credentials against the active backend.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> bool {
        if self.is_remote_primary() {
            if let Some(remote) = &self.remote {
                return match remote.sign_in(username, password).await {
                    Ok(ok) => ok,
                    Err(e) => {
                        tracing::warn!("Remote sign-in failed: {}", e);
                        false
                    }
                };
            }
        }

        let content = self.content.read().await;
        let user_ok = constant_time_compare(username, &content.admin.username);
        let pass_ok = constant_time_compare(password, &content.admin.password);
        user_ok & pass_ok
    }

    // ==================== BACKUP ====================

    /// Full content as pretty-printed JSON.
    pub async fn export_json(&self) -> Result<String, AppError> {
        let content = self.content.read().await;
        serde_json::to_string_pretty(&*content)
            .map_err(|e| AppError::Internal(format!("Failed to serialize content: {}", e)))
    }

    /// Replace all content with an exported snapshot.
    ///
    /// Malformed input leaves the current content untouched.
    pub async fn import_json(&self, raw: &str) -> Result<(), AppError> {
        let imported = restore(raw, IconPolicy::Reject).map_err(|e| {
            AppError::BadRequest(format!(
                "Error importing data. Please check the file format. ({})",
                e.message()
            ))
        })?;
        validate_invariants(&imported)?;

        let mut content = self.content.write().await;
        *content = imported;
        self.persist(&content).await;
        let ops = full_sync_ops(&content);
        drop(content);

        tracing::info!("Imported content snapshot");
        self.replicate(|| ops);
        Ok(())
    }
}

/// Fetch every collection and overlay it onto the default template.
///
/// An empty collection keeps the template's value.
async fn load_remote(remote: &dyn RemoteBackend) -> Result<SiteContent, AppError> {
    let mut overlay = Map::new();

    for (collection, key) in LIST_COLLECTIONS {
        let documents = remote.fetch_collection(collection).await?;
        if !documents.is_empty() {
            overlay.insert(key.to_string(), Value::Array(documents));
        }
    }

    for document in remote.fetch_collection(Collection::Pages).await? {
        let page = document
            .get("id")
            .and_then(Value::as_str)
            .and_then(PageKey::from_name);
        if let (Some(page), Some(content)) = (page, document.get("content")) {
            overlay.insert(page.as_str().to_string(), content.clone());
        }
    }

    for document in remote.fetch_collection(Collection::Settings).await? {
        if document.get("id").and_then(Value::as_str) == Some(SETTINGS_DOCUMENT_ID) {
            if let Some(settings) = document.get("content") {
                overlay.insert("settings".to_string(), settings.clone());
            }
        }
    }

    restore_value(Value::Object(overlay), IconPolicy::ResetPage)
}

/// Millisecond timestamp id, bumped past any id already in the list.
pub fn generate_id<'a>(existing: impl Iterator<Item = &'a str>) -> String {
    let taken: HashSet<&str> = existing.collect();
    let mut candidate = Utc::now().timestamp_millis();
    while taken.contains(candidate.to_string().as_str()) {
        candidate += 1;
    }
    candidate.to_string()
}

fn upsert_op<T: Serialize>(collection: Collection, id: &str, value: &T) -> Vec<MirrorOp> {
    match serde_json::to_value(value) {
        Ok(document) => vec![MirrorOp::upsert(collection, id, document)],
        Err(e) => {
            tracing::error!("Could not serialize {} document {}: {}", collection.as_str(), id, e);
            Vec::new()
        }
    }
}

fn notice_ops(notices: &[Notice], ids: &[String]) -> Vec<MirrorOp> {
    notices
        .iter()
        .filter(|n| ids.contains(&n.id))
        .flat_map(|n| upsert_op(Collection::Notices, &n.id, n))
        .collect()
}

fn settings_ops(settings: &Settings) -> Vec<MirrorOp> {
    match serde_json::to_value(settings) {
        Ok(value) => vec![MirrorOp::upsert(
            Collection::Settings,
            SETTINGS_DOCUMENT_ID,
            wrap_document(SETTINGS_DOCUMENT_ID, &value),
        )],
        Err(e) => {
            tracing::error!("Could not serialize settings: {}", e);
            Vec::new()
        }
    }
}

/// Upserts for every document, used after an import.
///
/// Remote documents absent from the import are left in place.
fn full_sync_ops(content: &SiteContent) -> Vec<MirrorOp> {
    let mut ops = settings_ops(&content.settings);
    for page in PageKey::ALL {
        ops.push(MirrorOp::upsert(
            Collection::Pages,
            page.as_str(),
            wrap_document(page.as_str(), content.page(page)),
        ));
    }
    for n in &content.notices {
        ops.extend(upsert_op(Collection::Notices, &n.id, n));
    }
    for b in &content.blogs {
        ops.extend(upsert_op(Collection::Blogs, &b.id, b));
    }
    for g in &content.gallery {
        ops.extend(upsert_op(Collection::Gallery, &g.id, g));
    }
    for m in &content.contact_messages {
        ops.extend(upsert_op(Collection::Messages, &m.id, m));
    }
    ops
}

#[cfg(test)]
mod tests;
