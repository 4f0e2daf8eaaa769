// Download tasks — the simpler sibling of profile grabs.
//
// Same ownership discipline: one worker writes the record, pollers read
// snapshots. Progress is a percentage streamed from the extractor's
// stdout rather than an item count.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, OwnedSemaphorePermit};
use tracing::{debug, error, info};

use super::{Registry, Timestamped};
use crate::extractor::MediaExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Starting,
    Downloading,
    Completed,
    Error,
}

/// One download's record: a percentage while running, then either the
/// produced filename or an error message.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadTask {
    pub status: DownloadStatus,
    pub percent: f32,
    pub filename: Option<String>,
    pub error: Option<String>,
    pub url: String,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl DownloadTask {
    pub fn new(url: &str) -> Self {
        Self {
            status: DownloadStatus::Starting,
            percent: 0.0,
            filename: None,
            error: None,
            url: url.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl Timestamped for DownloadTask {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Store for download tasks.
pub type DownloadStore = Registry<DownloadTask>;

/// Launch one download in a background tokio task. Progress percentages
/// flow from the extractor through a channel into the record; the worker
/// is the record's only writer.
pub fn launch_download(
    store: Arc<DownloadStore>,
    task_id: String,
    url: String,
    extractor: Arc<MediaExtractor>,
    dest_dir: std::path::PathBuf,
    permit: OwnedSemaphorePermit,
) {
    tokio::spawn(async move {
        let _permit = permit;
        debug!(task_id = %task_id, url = %url, "download worker started");

        let (tx, mut rx) = mpsc::unbounded_channel();
        store
            .update(&task_id, |t| t.status = DownloadStatus::Downloading)
            .await;

        let forward_store = store.clone();
        let forward_id = task_id.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(percent) = rx.recv().await {
                forward_store
                    .update(&forward_id, |t| t.percent = percent)
                    .await;
            }
        });

        let result = extractor.download(&url, &dest_dir, tx).await;
        let _ = forwarder.await;

        match result {
            Ok(path) => {
                info!(task_id = %task_id, file = %path.display(), "download completed");
                store
                    .update(&task_id, |t| {
                        t.status = DownloadStatus::Completed;
                        t.percent = 100.0;
                        t.filename = Some(path.display().to_string());
                    })
                    .await;
            }
            Err(e) => {
                error!(task_id = %task_id, error = %e, "download failed");
                store
                    .update(&task_id, |t| {
                        t.status = DownloadStatus::Error;
                        t.error = Some(e.to_string());
                    })
                    .await;
            }
        }
    });
}
