use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    /// Base URL of the third-party aggregator API.
    pub api_base_url: String,
    /// Bearer key for the aggregator API (MAGPIE_API_KEY env var).
    pub api_key: String,
    /// Path to the yt-dlp binary used for generic extraction and downloads.
    pub extractor_bin: PathBuf,
    /// Overall timeout for one flat-listing extraction run.
    pub extractor_timeout: Duration,
    /// Where downloaded files land.
    pub download_dir: PathBuf,
    /// Concurrent profile grabs allowed before requests are rejected.
    pub max_concurrent_grabs: usize,
    /// Concurrent downloads allowed before requests are rejected.
    pub max_concurrent_downloads: usize,
    /// Age after which finished (or abandoned) task records are evicted.
    pub task_ttl: chrono::Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a workable default except the aggregator key — the
    /// extractor-only platforms run without it, so it is validated lazily
    /// via `require_api_key` rather than at load time.
    pub fn load() -> Result<Self> {
        let extractor_timeout = env::var("MAGPIE_EXTRACTOR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(180);
        let max_concurrent_grabs = env::var("MAGPIE_MAX_GRABS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4);
        let max_concurrent_downloads = env::var("MAGPIE_MAX_DOWNLOADS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);
        let task_ttl_hours: i64 = env::var("MAGPIE_TASK_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(6);

        Ok(Self {
            api_base_url: env::var("MAGPIE_API_BASE_URL")
                .unwrap_or_else(|_| crate::aggregator::client::DEFAULT_API_BASE_URL.to_string()),
            api_key: env::var("MAGPIE_API_KEY").unwrap_or_default(),
            extractor_bin: env::var("MAGPIE_YTDLP_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("yt-dlp")),
            extractor_timeout: Duration::from_secs(extractor_timeout),
            download_dir: env::var("MAGPIE_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./downloads")),
            max_concurrent_grabs,
            max_concurrent_downloads,
            task_ttl: chrono::Duration::hours(task_ttl_hours),
        })
    }

    /// Check that the aggregator API key is configured.
    /// Call this before any operation that hits the aggregator endpoints.
    pub fn require_api_key(&self) -> Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!(
                "MAGPIE_API_KEY not set. Add it to your .env file.\n\
                 Without it only the generic-extraction path is available."
            );
        }
        Ok(())
    }
}
