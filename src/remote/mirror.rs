//! Best-effort replication of local mutations.
//!
//! Writes run on one background worker, in the order they were dispatched.
//! Their outcome goes to a bounded log and is never reported back to the
//! caller that made the change.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use super::{Collection, RemoteBackend};

/// Entries kept in the mirror log.
const MIRROR_LOG_CAPACITY: usize = 200;

/// What to do with a remote document.
#[derive(Debug, Clone)]
pub enum MirrorAction {
    Upsert(Value),
    Delete,
}

/// One pending remote write.
#[derive(Debug, Clone)]
pub struct MirrorOp {
    pub collection: Collection,
    pub document_id: String,
    pub action: MirrorAction,
}

impl MirrorOp {
    pub fn upsert(collection: Collection, document_id: impl Into<String>, document: Value) -> Self {
        Self {
            collection,
            document_id: document_id.into(),
            action: MirrorAction::Upsert(document),
        }
    }

    pub fn delete(collection: Collection, document_id: impl Into<String>) -> Self {
        Self {
            collection,
            document_id: document_id.into(),
            action: MirrorAction::Delete,
        }
    }
}

/// Recorded outcome of a remote write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorEntry {
    pub at: String,
    pub collection: Collection,
    pub document_id: String,
    pub action: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bounded, newest-last log of mirror outcomes.
#[derive(Default)]
pub struct MirrorLog {
    entries: Mutex<VecDeque<MirrorEntry>>,
}

impl MirrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, entry: MirrorEntry) {
        let mut entries = self.entries.lock().await;
        if entries.len() == MIRROR_LOG_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub async fn entries(&self) -> Vec<MirrorEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }
}

/// Fire-and-forget dispatcher for remote writes.
#[derive(Clone)]
pub struct Mirror {
    queue: mpsc::UnboundedSender<Vec<MirrorOp>>,
}

impl Mirror {
    /// Start the mirror worker. Must be called inside a tokio runtime.
    pub fn new(remote: Arc<dyn RemoteBackend>, log: Arc<MirrorLog>) -> Self {
        let (queue, batches) = mpsc::unbounded_channel();
        tokio::spawn(mirror_worker(remote, log, batches));
        Self { queue }
    }

    /// Queue `ops` behind everything dispatched before them.
    pub fn dispatch(&self, ops: Vec<MirrorOp>) {
        if ops.is_empty() {
            return;
        }
        if self.queue.send(ops).is_err() {
            tracing::warn!("Mirror worker has stopped; remote writes dropped");
        }
    }
}

/// Apply batches one at a time until every sender is gone.
async fn mirror_worker(
    remote: Arc<dyn RemoteBackend>,
    log: Arc<MirrorLog>,
    mut batches: mpsc::UnboundedReceiver<Vec<MirrorOp>>,
) {
    while let Some(ops) = batches.recv().await {
        for op in ops {
            apply(remote.as_ref(), &log, op).await;
        }
    }
}

async fn apply(remote: &dyn RemoteBackend, log: &MirrorLog, op: MirrorOp) {
    let (action, result) = match &op.action {
        MirrorAction::Upsert(document) => (
            "upsert",
            remote
                .upsert_document(op.collection, &op.document_id, document)
                .await,
        ),
        MirrorAction::Delete => (
            "delete",
            remote.delete_document(op.collection, &op.document_id).await,
        ),
    };

    if let Err(e) = &result {
        tracing::warn!(
            collection = op.collection.as_str(),
            document_id = %op.document_id,
            "Remote {} failed: {}",
            action,
            e
        );
    }

    log.record(MirrorEntry {
        at: Utc::now().to_rfc3339(),
        collection: op.collection,
        document_id: op.document_id,
        action,
        ok: result.is_ok(),
        error: result.err().map(|e| e.message()),
    })
    .await;
}
