// Task registry — process-wide store of background work records.
//
// Each record is written by exactly one background worker and only read by
// everyone else (HTTP handlers, the CLI poll loop). All writes funnel
// through `Registry::update`, so that single-writer discipline survives
// even if the backing map is ever swapped for something with more writers.
//
// Records are evicted lazily: every `create` drops records older than the
// configured TTL, so the map cannot grow without bound across a long-lived
// process.

pub mod download;
pub mod runner;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::item::{ProfileInfo, UnifiedItem};
use crate::platform::Platform;

/// Lifecycle of a profile grab, as reported to polling clients.
///
/// `unknown` is not a state a task can be in — the HTTP layer synthesizes
/// it for ids that don't resolve to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrabStatus {
    Starting,
    GettingProfile,
    Grabbing,
    Completed,
    Error,
}

impl GrabStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GrabStatus::Completed | GrabStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrabStatus::Starting => "starting",
            GrabStatus::GettingProfile => "getting_profile",
            GrabStatus::Grabbing => "grabbing",
            GrabStatus::Completed => "completed",
            GrabStatus::Error => "error",
        }
    }
}

/// The mutable unit of background profile-grab work.
///
/// `videos` is append-only within one task and `total` mirrors its length
/// after every append, so pollers see continuous progress. `message` is
/// overwritten each step, never accumulated.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileTask {
    pub status: GrabStatus,
    pub message: String,
    pub profile: Option<ProfileInfo>,
    pub videos: Vec<UnifiedItem>,
    pub total: usize,
    pub url: String,
    pub platform: Platform,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl ProfileTask {
    pub fn new(url: &str, platform: Platform) -> Self {
        Self {
            status: GrabStatus::Starting,
            message: "Starting…".to_string(),
            profile: None,
            videos: Vec::new(),
            total: 0,
            url: url.to_string(),
            platform,
            created_at: Utc::now(),
        }
    }
}

/// Anything a `Registry` can age out.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}

impl Timestamped for ProfileTask {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Concurrency-safe map from task id to record.
///
/// Readers get cloned snapshots; the one writer per record goes through
/// `update`. Ids are short (8 hex chars) — enough for a single-operator
/// tool, and friendlier to paste than a full UUID.
pub struct Registry<T> {
    records: RwLock<HashMap<String, T>>,
    ttl: chrono::Duration,
}

impl<T: Clone + Timestamped> Registry<T> {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Insert a fresh record and return its id. Sweeps expired records
    /// first, so the registry stays bounded without a background job.
    pub async fn create(&self, record: T) -> String {
        self.evict_older_than(self.ttl).await;
        let id = new_task_id();
        self.records.write().await.insert(id.clone(), record);
        id
    }

    /// Read-only snapshot. None for unknown ids — callers decide whether
    /// that maps to a sentinel status or an error.
    pub async fn get(&self, id: &str) -> Option<T> {
        self.records.read().await.get(id).cloned()
    }

    /// The single entry point for mutating a record. A missing id is a
    /// no-op: an evicted task's worker may still be running, and its
    /// writes just land nowhere.
    pub async fn update<F: FnOnce(&mut T)>(&self, id: &str, f: F) {
        if let Some(record) = self.records.write().await.get_mut(id) {
            f(record);
        }
    }

    /// Drop every record older than `age`.
    pub async fn evict_older_than(&self, age: chrono::Duration) {
        let cutoff = Utc::now() - age;
        self.records
            .write()
            .await
            .retain(|_, r| r.created_at() > cutoff);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

/// Store for profile-grab tasks.
pub type TaskStore = Registry<ProfileTask>;

fn new_task_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// A worker's handle to its own task record: the store plus the id, with
/// the mutations the grab pipeline needs. Cloning shares the same record.
#[derive(Clone)]
pub struct TaskHandle {
    store: Arc<TaskStore>,
    id: String,
}

impl TaskHandle {
    pub fn new(store: Arc<TaskStore>, id: String) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn set_status(&self, status: GrabStatus, message: &str) {
        self.store
            .update(&self.id, |t| {
                t.status = status;
                t.message = message.to_string();
            })
            .await;
    }

    pub async fn set_message(&self, message: &str) {
        self.store
            .update(&self.id, |t| t.message = message.to_string())
            .await;
    }

    pub async fn set_profile(&self, profile: ProfileInfo) {
        self.store
            .update(&self.id, |t| t.profile = Some(profile))
            .await;
    }

    pub async fn profile(&self) -> Option<ProfileInfo> {
        self.store.get(&self.id).await.and_then(|t| t.profile)
    }

    /// Append one item and return the new total. The total is kept in sync
    /// on every append so a polling client sees the count move.
    pub async fn push_item(&self, item: UnifiedItem) -> usize {
        let mut total = 0;
        self.store
            .update(&self.id, |t| {
                t.videos.push(item);
                t.total = t.videos.len();
                total = t.total;
            })
            .await;
        total
    }

    pub async fn total(&self) -> usize {
        self.store.get(&self.id).await.map(|t| t.total).unwrap_or(0)
    }

    /// Ids already collected — used to deduplicate supplementary passes.
    pub async fn item_ids(&self) -> HashSet<String> {
        self.store
            .get(&self.id)
            .await
            .map(|t| t.videos.into_iter().map(|v| v.id).collect())
            .unwrap_or_default()
    }

    pub async fn complete(&self, message: &str) {
        self.set_status(GrabStatus::Completed, message).await;
    }

    pub async fn fail(&self, message: &str) {
        self.set_status(GrabStatus::Error, message).await;
    }

    pub async fn snapshot(&self) -> Option<ProfileTask> {
        self.store.get(&self.id).await
    }
}
