// Generic media extraction — drives the external yt-dlp binary.
//
// Two modes: flat listing (profile/channel crawl without downloading,
// used as the last fallback tier for every platform) and download. Both
// run the binary under tokio::process with an overall timeout;
// kill_on_drop reaps the child if the timeout fires.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

use crate::aggregator::client::BROWSER_USER_AGENT;
use crate::aggregator::{num_of, str_of};
use crate::grab::{GrabContext, GrabTier, TierOutcome};
use crate::item::{truncate_chars, ItemKind, ProfileInfo, UnifiedItem, MAX_TEXT_CHARS};
use crate::platform::Platform;
use crate::task::GrabStatus;

/// Downloads can legitimately run long; listings cannot.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

pub struct MediaExtractor {
    bin: PathBuf,
    listing_timeout: Duration,
}

impl MediaExtractor {
    pub fn new(bin: PathBuf, listing_timeout: Duration) -> Self {
        Self {
            bin,
            listing_timeout,
        }
    }

    /// Crawl a URL in flat-listing mode and return the parsed JSON tree.
    /// `limit` > 0 caps how deep into the listing the crawl goes.
    pub async fn flat_listing(&self, url: &str, limit: usize) -> Result<Value> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--dump-single-json")
            .arg("--flat-playlist")
            .arg("--no-warnings")
            .arg("--ignore-errors")
            .arg("--socket-timeout")
            .arg("30")
            .arg("--user-agent")
            .arg(BROWSER_USER_AGENT);
        if limit > 0 {
            cmd.arg("--playlist-end").arg(limit.to_string());
        }
        cmd.arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(url, limit, "extractor flat listing");
        let output = tokio::time::timeout(self.listing_timeout, cmd.output())
            .await
            .map_err(|_| {
                anyhow!(
                    "extractor timed out after {}s",
                    self.listing_timeout.as_secs()
                )
            })?
            .context("failed to run extractor binary")?;

        if output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "extractor produced no output: {}",
                stderr.lines().last().unwrap_or("unknown error")
            );
        }
        serde_json::from_slice(&output.stdout).context("extractor output was not valid JSON")
    }

    /// Download one URL into `dest_dir`, streaming progress percentages
    /// through `progress`. Returns the path of the produced file.
    pub async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        progress: mpsc::UnboundedSender<f32>,
    ) -> Result<PathBuf> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--newline")
            .arg("--no-warnings")
            .arg("--socket-timeout")
            .arg("30")
            .arg("--user-agent")
            .arg(BROWSER_USER_AGENT)
            .arg("-o")
            .arg(dest_dir.join("%(title).100s [%(id)s].%(ext)s"))
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(url, "extractor download");
        let mut child = cmd.spawn().context("failed to spawn extractor binary")?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("extractor child has no stdout"))?;

        let run = async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut destination: Option<PathBuf> = None;
            while let Some(line) = lines.next_line().await? {
                if let Some(pct) = parse_progress(&line) {
                    let _ = progress.send(pct);
                }
                if let Some(path) = parse_destination(&line) {
                    destination = Some(path);
                }
            }
            let status = child.wait().await?;
            if !status.success() {
                bail!("extractor exited with {status}");
            }
            destination.ok_or_else(|| anyhow!("download finished but no output file was reported"))
        };

        match tokio::time::timeout(DOWNLOAD_TIMEOUT, run).await {
            Ok(result) => result,
            // Dropping the future drops the child, which kills it.
            Err(_) => bail!("download timed out after {}s", DOWNLOAD_TIMEOUT.as_secs()),
        }
    }
}

/// Parse a `[download]  42.3% of ...` progress line into its percentage.
pub fn parse_progress(line: &str) -> Option<f32> {
    let rest = line.strip_prefix("[download]")?.trim_start();
    let token = rest.split_whitespace().next()?;
    token.strip_suffix('%')?.parse().ok()
}

/// Track where the extractor is writing. The final file may be announced
/// by the downloader, the merger, or an already-downloaded notice.
fn parse_destination(line: &str) -> Option<PathBuf> {
    if let Some(path) = line.strip_prefix("[download] Destination: ") {
        return Some(PathBuf::from(path.trim()));
    }
    if let Some(rest) = line.strip_prefix("[Merger] Merging formats into \"") {
        return Some(PathBuf::from(rest.trim_end_matches('"')));
    }
    if let Some(rest) = line.strip_prefix("[download] ") {
        if let Some(path) = rest.strip_suffix(" has already been downloaded") {
            return Some(PathBuf::from(path.trim()));
        }
    }
    None
}

/// Flatten one level of nested playlists out of a listing tree. Channels
/// often wrap their tabs (videos, shorts) in sub-playlists; the leaves of
/// those are what we want.
pub fn flatten_entries(info: &Value) -> Vec<Value> {
    let mut out = Vec::new();
    let Some(raw) = info.get("entries").and_then(Value::as_array) else {
        return out;
    };
    for entry in raw {
        if entry.is_null() {
            continue;
        }
        let nested = entry.get("_type").and_then(Value::as_str) == Some("playlist")
            || entry.get("entries").is_some();
        if nested {
            if let Some(sub) = entry.get("entries").and_then(Value::as_array) {
                out.extend(sub.iter().filter(|e| !e.is_null()).cloned());
            }
        } else {
            out.push(entry.clone());
        }
    }
    out
}

/// Convert one flat-listing entry to the unified schema.
pub fn normalize_entry(entry: &Value, platform: Option<Platform>) -> Option<UnifiedItem> {
    let id = crate::aggregator::id_of(entry, &["id"]);
    if id.is_empty() {
        return None;
    }

    let mut thumbnail = entry
        .get("thumbnails")
        .and_then(Value::as_array)
        .and_then(|t| t.last())
        .map(|t| str_of(t, &["url"]))
        .unwrap_or_default();
    if thumbnail.is_empty() {
        thumbnail = str_of(entry, &["thumbnail"]);
    }

    let url = str_of(entry, &["webpage_url", "url"]);
    let platform = platform.or_else(|| Platform::detect(&url))?;
    let duration = entry
        .get("duration")
        .map(crate::aggregator::coerce_u64)
        .unwrap_or(0);

    let title = truncate_chars(&str_of(entry, &["title", "description"]), MAX_TEXT_CHARS);
    Some(UnifiedItem {
        id,
        title: if title.is_empty() { "Post".to_string() } else { title },
        url,
        thumbnail,
        duration,
        view_count: num_of(entry, &["view_count"]),
        like_count: num_of(entry, &["like_count"]),
        comment_count: num_of(entry, &["comment_count"]),
        share_count: num_of(entry, &["repost_count"]),
        create_time: num_of(entry, &["timestamp"]) as i64,
        author: str_of(entry, &["uploader", "channel"]),
        platform,
        kind: if duration == 0 { ItemKind::Photo } else { ItemKind::Video },
    })
}

/// Synthesize profile info from a listing's header fields.
pub fn profile_from_listing(info: &Value, username: &str, entry_count: usize) -> ProfileInfo {
    let avatar = info
        .get("thumbnails")
        .and_then(Value::as_array)
        .and_then(|t| t.last())
        .map(|t| str_of(t, &["url"]))
        .unwrap_or_default();
    let video_count = {
        let n = num_of(info, &["playlist_count"]);
        if n == 0 { entry_count as u64 } else { n }
    };
    ProfileInfo {
        nickname: {
            let n = str_of(info, &["title", "uploader", "channel"]);
            if n.is_empty() { username.to_string() } else { n }
        },
        username: {
            let u = str_of(info, &["uploader_id", "channel_id"]);
            if u.is_empty() { username.to_string() } else { u }
        },
        avatar,
        signature: truncate_chars(&str_of(info, &["description"]), MAX_TEXT_CHARS),
        followers: num_of(info, &["channel_follower_count"]),
        following: 0,
        likes: 0,
        video_count,
    }
}

/// The last tier in every chain: crawl the original URL with the
/// extractor and take whatever it lists. Also the only tier for platforms
/// without aggregator coverage.
pub struct ExtractorTier {
    pub extractor: Arc<MediaExtractor>,
}

impl ExtractorTier {
    /// YouTube channel pages list their tabs unless pointed straight at
    /// the videos tab.
    fn listing_url(ctx: &GrabContext) -> String {
        if ctx.platform == Platform::YouTube
            && ctx.url.contains('@')
            && !ctx.url.contains("/videos")
            && !ctx.url.contains("/shorts")
        {
            format!("{}/videos", ctx.url.trim_end_matches('/'))
        } else {
            ctx.url.clone()
        }
    }
}

#[async_trait]
impl GrabTier for ExtractorTier {
    fn name(&self) -> &'static str {
        "extractor"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(
            GrabStatus::GettingProfile,
            &format!("Scanning {}…", ctx.platform.display_name()),
        )
        .await;

        let info = match self
            .extractor
            .flat_listing(&Self::listing_url(ctx), ctx.max_items)
            .await
        {
            Ok(v) => v,
            Err(e) => return TierOutcome::Failed(e.to_string()),
        };

        let entries = flatten_entries(&info);
        if entries.is_empty() {
            return TierOutcome::Empty;
        }

        // A profile resolved by an earlier tier is kept; the listing
        // header only fills the gap.
        let username = ctx.username.clone().unwrap_or_default();
        if task.profile().await.is_none() {
            task.set_profile(profile_from_listing(&info, &username, entries.len()))
                .await;
        }
        task.set_status(
            GrabStatus::Grabbing,
            &format!("Processing {} posts…", entries.len()),
        )
        .await;

        let mut appended = 0usize;
        let mut total = task.total().await;
        for entry in &entries {
            if ctx.max_items > 0 && total >= ctx.max_items {
                break;
            }
            if let Some(item) = normalize_entry(entry, Some(ctx.platform)) {
                total = task.push_item(item).await;
                appended += 1;
            }
        }

        if appended == 0 {
            TierOutcome::Empty
        } else {
            TierOutcome::Grabbed(appended)
        }
    }
}
