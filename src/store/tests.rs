use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use super::*;
use crate::db::init_database;
use crate::models::{AdmissionForm, ContactForm, MessageType};
use crate::remote::MirrorEntry;

const KEY: &str = "school_site_data";

/// In-memory remote that can be told to fail.
#[derive(Default)]
struct FakeRemote {
    docs: Mutex<BTreeMap<(&'static str, String), Value>>,
    fail_fetch: AtomicBool,
    fail_writes: AtomicBool,
}

impl FakeRemote {
    async fn seed(&self, collection: Collection, id: &str, doc: Value) {
        self.docs
            .lock()
            .await
            .insert((collection.as_str(), id.to_string()), doc);
    }

    async fn get(&self, collection: Collection, id: &str) -> Option<Value> {
        self.docs
            .lock()
            .await
            .get(&(collection.as_str(), id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl RemoteBackend for FakeRemote {
    async fn fetch_collection(&self, collection: Collection) -> Result<Vec<Value>, AppError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(AppError::Remote("unreachable".to_string()));
        }
        let docs = self.docs.lock().await;
        Ok(docs
            .iter()
            .filter(|((c, _), _)| *c == collection.as_str())
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn upsert_document(
        &self,
        collection: Collection,
        id: &str,
        document: &Value,
    ) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Remote("write rejected".to_string()));
        }
        self.seed(collection, id, document.clone()).await;
        Ok(())
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Remote("write rejected".to_string()));
        }
        self.docs
            .lock()
            .await
            .remove(&(collection.as_str(), id.to_string()));
        Ok(())
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<bool, AppError> {
        Ok(username == "office@school.test" && password == "remote-pass")
    }
}

async fn repo(dir: &TempDir) -> Repository {
    let pool = init_database(&dir.path().join("test.sqlite")).await.unwrap();
    Repository::new(pool)
}

async fn local_store(dir: &TempDir) -> ContentStore {
    ContentStore::open(repo(dir).await, KEY, None).await
}

async fn remote_store(dir: &TempDir, remote: Arc<FakeRemote>) -> ContentStore {
    ContentStore::open(repo(dir).await, KEY, Some(remote as Arc<dyn RemoteBackend>)).await
}

async fn wait_for_log(store: &ContentStore, count: usize) -> Vec<MirrorEntry> {
    for _ in 0..200 {
        let entries = store.mirror_log().entries().await;
        if entries.len() >= count {
            return entries;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("mirror log never reached {} entries", count);
}

fn new_notice(title: &str) -> CreateNoticeRequest {
    CreateNoticeRequest {
        title: title.to_string(),
        content: "c".to_string(),
        category: "General".to_string(),
        is_pinned: false,
        is_latest: false,
    }
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|i| id(i).to_string()).collect()
}

#[tokio::test]
async fn test_fresh_store_persists_defaults() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;

    assert!(!store.is_loading());
    assert!(!store.is_remote_primary());
    assert_eq!(store.snapshot().await, default_content());

    let saved = store.repo.load_snapshot(KEY).await.unwrap().unwrap();
    assert_eq!(restore(&saved, IconPolicy::Reject).unwrap(), default_content());
    assert_eq!(store.revision(), 1);
}

#[tokio::test]
async fn test_saved_content_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let store = local_store(&dir).await;
        store.add_notice(new_notice("Exam routine")).await.unwrap();
    }

    let store = local_store(&dir).await;
    let titles = store
        .read(|c| c.notices.iter().map(|n| n.title.clone()).collect::<Vec<_>>())
        .await;
    assert_eq!(titles[0], "Exam routine");
    assert_eq!(titles.len(), default_content().notices.len() + 1);
}

#[tokio::test]
async fn test_partial_snapshot_is_backfilled() {
    let dir = TempDir::new().unwrap();
    let repo = repo(&dir).await;

    // Written by an older version that had no gallery and one notice
    let saved = json!({
        "settings": { "schoolName": "Hilltop School" },
        "notices": [{
            "id": "n1", "title": "Only notice", "content": "", "category": "General",
            "date": "2026-01-01", "isLatest": false, "isPinned": false
        }]
    });
    repo.save_snapshot(KEY, &saved.to_string()).await.unwrap();

    let store = ContentStore::open(repo, KEY, None).await;
    let content = store.snapshot().await;

    assert_eq!(content.settings.school_name, "Hilltop School");
    assert_eq!(content.notices.len(), 1);
    assert_eq!(content.gallery, default_content().gallery);
    assert_eq!(content.blogs, default_content().blogs);
    assert_eq!(content.admin, default_content().admin);
}

#[tokio::test]
async fn test_corrupt_snapshot_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let repo = repo(&dir).await;
    repo.save_snapshot(KEY, "{ not json").await.unwrap();

    let store = ContentStore::open(repo, KEY, None).await;
    assert_eq!(store.snapshot().await, default_content());
}

#[tokio::test]
async fn test_add_notice_scenario() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;
    let before = store.read(|c| c.notices.len()).await;

    let notice = store.add_notice(new_notice("A")).await.unwrap();

    let content = store.snapshot().await;
    assert_eq!(content.notices.len(), before + 1);
    assert_eq!(content.notices[0], notice);
    assert!(!notice.id.is_empty());
    assert!(!notice.is_latest);
    assert_eq!(notice.category, "General");
    // The previous winner keeps the flag
    assert_eq!(content.notices.iter().filter(|n| n.is_latest).count(), 1);
}

#[tokio::test]
async fn test_add_notice_as_latest_takes_the_flag() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;

    let notice = store
        .add_notice(CreateNoticeRequest {
            is_latest: true,
            ..new_notice("Results published")
        })
        .await
        .unwrap();

    assert!(notice.is_latest);
    let winners: Vec<String> = store
        .read(|c| {
            c.notices
                .iter()
                .filter(|n| n.is_latest)
                .map(|n| n.id.clone())
                .collect()
        })
        .await;
    assert_eq!(winners, vec![notice.id]);
}

#[tokio::test]
async fn test_set_latest_single_winner_for_any_prior_state() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;
    let all_ids = store.read(|c| ids(&c.notices, |n| &n.id)).await;

    for target in &all_ids {
        store.set_latest_notice(target).await.unwrap();
        let winners: Vec<String> = store
            .read(|c| {
                c.notices
                    .iter()
                    .filter(|n| n.is_latest)
                    .map(|n| n.id.clone())
                    .collect()
            })
            .await;
        assert_eq!(&winners, &vec![target.clone()]);
    }

    // Unknown id changes nothing
    let before = store.snapshot().await;
    let err = store.set_latest_notice("missing").await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_crud_sequences_track_ids() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;
    let mut expected = store.read(|c| ids(&c.gallery, |g| &g.id)).await;

    let a = store
        .add_gallery_item(CreateGalleryItemRequest {
            title: "Art room".to_string(),
            image: "/img/art.jpg".to_string(),
            category: "Campus".to_string(),
        })
        .await
        .unwrap();
    let b = store
        .add_gallery_item(CreateGalleryItemRequest {
            title: "Bus".to_string(),
            image: "/img/bus.jpg".to_string(),
            category: "Campus".to_string(),
        })
        .await
        .unwrap();
    assert_ne!(a.id, b.id);
    expected.insert(0, a.id.clone());
    expected.insert(0, b.id.clone());

    let updated = store
        .update_gallery_item(
            &a.id,
            UpdateGalleryItemRequest {
                category: Some("Facilities".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.category, "Facilities");
    assert_eq!(updated.title, "Art room");

    assert!(store.delete_gallery_item(&a.id).await);
    expected.retain(|id| id != &a.id);

    // Deleting again, or deleting something that never existed, is a no-op
    let revision = store.revision();
    assert!(!store.delete_gallery_item(&a.id).await);
    assert!(!store.delete_gallery_item("never-there").await);
    assert_eq!(store.revision(), revision);

    assert_eq!(store.read(|c| ids(&c.gallery, |g| &g.id)).await, expected);

    let err = store
        .update_gallery_item("never-there", UpdateGalleryItemRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_blog_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;

    let blog = store
        .add_blog(CreateBlogRequest {
            title: "Robotics club".to_string(),
            excerpt: "Builds and bots".to_string(),
            content: "<p>Weekly sessions</p>".to_string(),
            image: String::new(),
            author: "IT Department".to_string(),
            category: "Technology".to_string(),
            published: false,
        })
        .await
        .unwrap();
    assert!(blog.comments.is_empty());
    assert!(!blog.published);

    let blog = store
        .update_blog(
            &blog.id,
            UpdateBlogRequest {
                published: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(blog.published);
    assert_eq!(blog.excerpt, "Builds and bots");

    assert!(store.delete_blog(&blog.id).await);
    assert!(store.read(|c| c.blogs.iter().all(|b| b.id != blog.id)).await);
}

#[tokio::test]
async fn test_admission_messages_are_tagged() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;

    let application = AdmissionForm {
        student_name: "Asha Rai".to_string(),
        date_of_birth: "2016-04-02".to_string(),
        grade: "4".to_string(),
        parent_name: "Maya Rai".to_string(),
        email: "maya@example.com".to_string(),
        phone: "9812345678".to_string(),
        address: "Kalanki".to_string(),
        message: String::new(),
    };
    let contact = ContactForm {
        name: "Hari".to_string(),
        email: "hari@example.com".to_string(),
        phone: String::new(),
        subject: "Transport".to_string(),
        message: "Is there a bus route?".to_string(),
    };

    let a = store
        .add_contact_message(application.into_new_message().unwrap())
        .await;
    let c = store
        .add_contact_message(contact.into_new_message().unwrap())
        .await;

    let content = store.snapshot().await;
    let applications: Vec<_> = content
        .contact_messages
        .iter()
        .filter(|m| m.kind == MessageType::Admission)
        .map(|m| m.id.clone())
        .collect();
    let general: Vec<_> = content
        .contact_messages
        .iter()
        .filter(|m| m.kind == MessageType::Contact)
        .map(|m| m.id.clone())
        .collect();

    assert_eq!(applications, vec![a.id.clone()]);
    assert_eq!(general, vec![c.id.clone()]);
    assert!(!a.read);

    let read = store.mark_message_read(&a.id, true).await.unwrap();
    assert!(read.read);
    assert!(store.delete_contact_message(&a.id).await);
    assert!(!store.delete_contact_message(&a.id).await);
}

#[tokio::test]
async fn test_verify_credentials_local() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;

    assert!(store.verify_credentials("admin", "admin123").await);
    assert!(!store.verify_credentials("admin", "wrong").await);
    assert!(!store.verify_credentials("", "").await);

    store
        .update_admin_credentials(UpdateCredentialsRequest {
            username: None,
            password: Some("n3w-pass".to_string()),
        })
        .await
        .unwrap();
    assert!(!store.verify_credentials("admin", "admin123").await);
    assert!(store.verify_credentials("admin", "n3w-pass").await);
}

#[tokio::test]
async fn test_page_update_rejects_unknown_icon() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;
    let before = store.snapshot().await;

    let err = store
        .update_page(
            PageKey::Home,
            json!({ "services": [{ "title": "Space", "icon": "FiRocket" }] }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert_eq!(store.snapshot().await, before);

    let about = json!({ "mission": { "title": "Learn", "description": "Every day" } });
    store.update_page(PageKey::About, about.clone()).await.unwrap();
    assert_eq!(store.read(|c| c.about.clone()).await, about);
}

#[tokio::test]
async fn test_export_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;
    store.add_notice(new_notice("Before export")).await.unwrap();
    let exported = store.export_json().await.unwrap();
    let original = store.snapshot().await;

    let other_dir = TempDir::new().unwrap();
    let other = local_store(&other_dir).await;
    other.import_json(&exported).await.unwrap();

    assert_eq!(other.snapshot().await, original);
    let reexported: Value = serde_json::from_str(&other.export_json().await.unwrap()).unwrap();
    let exported: Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(reexported, exported);

    // Import persisted: a restart sees it
    drop(other);
    let reopened = local_store(&other_dir).await;
    assert_eq!(reopened.snapshot().await, original);
}

#[tokio::test]
async fn test_malformed_import_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir).await;
    store.add_notice(new_notice("Keep me")).await.unwrap();
    let before = store.snapshot().await;

    let err = store.import_json("{\"notices\": [").await.unwrap_err();
    assert_eq!(err.error_code(), "BAD_REQUEST");

    let err = store
        .import_json(r#"{"notices": [{"title": "no id"}]}"#)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "BAD_REQUEST");

    let two_latest = json!({
        "notices": [
            { "id": "1", "title": "a", "isLatest": true },
            { "id": "2", "title": "b", "isLatest": true }
        ]
    });
    let err = store.import_json(&two_latest.to_string()).await.unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    assert_eq!(store.snapshot().await, before);
}

#[test]
fn test_generate_id_skips_taken() {
    let now = chrono::Utc::now().timestamp_millis();
    let taken: Vec<String> = (now..now + 50).map(|t| t.to_string()).collect();
    let id = generate_id(taken.iter().map(|s| s.as_str()));
    assert!(!taken.contains(&id));
    assert!(id.parse::<i64>().unwrap() >= now);
}

// ==================== REMOTE ====================

#[tokio::test]
async fn test_mutations_are_mirrored() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::default());
    let store = remote_store(&dir, remote.clone()).await;
    assert!(store.is_remote_primary());

    let notice = store.add_notice(new_notice("Mirrored")).await.unwrap();
    let entries = wait_for_log(&store, 1).await;
    assert!(entries[0].ok);
    assert_eq!(
        remote.get(Collection::Notices, &notice.id).await.unwrap()["title"],
        "Mirrored"
    );

    store.delete_notice(&notice.id).await;
    wait_for_log(&store, 2).await;
    assert!(remote.get(Collection::Notices, &notice.id).await.is_none());

    store
        .update_page(PageKey::About, json!({ "mission": { "title": "M" } }))
        .await
        .unwrap();
    wait_for_log(&store, 3).await;
    let page = remote.get(Collection::Pages, "about").await.unwrap();
    assert_eq!(page["content"]["mission"]["title"], "M");
}

#[tokio::test]
async fn test_set_latest_mirrors_every_changed_notice() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::default());
    let store = remote_store(&dir, remote.clone()).await;

    let previous = store
        .read(|c| c.notices.iter().find(|n| n.is_latest).map(|n| n.id.clone()))
        .await
        .unwrap();
    let target = store
        .read(|c| c.notices.iter().find(|n| !n.is_latest).map(|n| n.id.clone()))
        .await
        .unwrap();

    store.set_latest_notice(&target).await.unwrap();
    wait_for_log(&store, 2).await;

    assert_eq!(remote.get(Collection::Notices, &target).await.unwrap()["isLatest"], true);
    assert_eq!(remote.get(Collection::Notices, &previous).await.unwrap()["isLatest"], false);
}

#[tokio::test]
async fn test_remote_write_failure_keeps_local_change() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::default());
    let store = remote_store(&dir, remote.clone()).await;
    remote.fail_writes.store(true, Ordering::SeqCst);

    let notice = store.add_notice(new_notice("Local only")).await.unwrap();

    let entries = wait_for_log(&store, 1).await;
    assert!(!entries[0].ok);
    assert_eq!(entries[0].error.as_deref(), Some("write rejected"));
    assert!(store.read(|c| c.notices[0].id == notice.id).await);
}

#[tokio::test]
async fn test_remote_primary_overlays_collections() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::default());
    remote
        .seed(
            Collection::Notices,
            "r1",
            json!({ "id": "r1", "title": "From remote", "isLatest": true }),
        )
        .await;
    remote
        .seed(
            Collection::Settings,
            SETTINGS_DOCUMENT_ID,
            json!({ "id": "site", "content": { "schoolName": "Remote School" } }),
        )
        .await;

    let store = remote_store(&dir, remote).await;
    let content = store.snapshot().await;

    assert!(store.is_remote_primary());
    assert_eq!(ids(&content.notices, |n| &n.id), vec!["r1"]);
    assert_eq!(content.settings.school_name, "Remote School");
    // Empty remote collections keep the template
    assert_eq!(content.blogs, default_content().blogs);

    // Remote-primary does not write the local snapshot
    assert!(store.repo.load_snapshot(KEY).await.unwrap().is_none());
    assert!(store.verify_credentials("office@school.test", "remote-pass").await);
    assert!(!store.verify_credentials("admin", "admin123").await);
}

#[tokio::test]
async fn test_remote_primary_refuses_credential_change() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::default());
    let store = remote_store(&dir, remote).await;
    assert!(store.is_remote_primary());
    let revision = store.revision();

    let result = store
        .update_admin_credentials(UpdateCredentialsRequest {
            username: None,
            password: Some("n3w".to_string()),
        })
        .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(store.snapshot().await.admin.password, "admin123");
    assert_eq!(store.revision(), revision);
    assert!(store.verify_credentials("office@school.test", "remote-pass").await);
}

#[tokio::test]
async fn test_remote_fetch_failure_falls_back_to_local() {
    let dir = TempDir::new().unwrap();
    {
        let store = local_store(&dir).await;
        store.add_notice(new_notice("Saved locally")).await.unwrap();
    }

    let remote = Arc::new(FakeRemote::default());
    remote.fail_fetch.store(true, Ordering::SeqCst);
    let store = remote_store(&dir, remote.clone()).await;

    assert!(!store.is_remote_primary());
    assert!(store.read(|c| c.notices[0].title == "Saved locally").await);
    assert!(store.verify_credentials("admin", "admin123").await);

    // Still mirrors, and now also persists locally
    let revision = store.revision();
    let notice = store.add_notice(new_notice("After fallback")).await.unwrap();
    assert!(store.revision() > revision);
    wait_for_log(&store, 1).await;
    assert!(remote.get(Collection::Notices, &notice.id).await.is_some());
}
