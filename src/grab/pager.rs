// The pagination loop shared by every aggregator-backed platform.
//
// Upstream APIs disagree on everything about paging — integer offsets,
// opaque tokens, 1-based page numbers — so the cursor is carried as an
// opaque enum the platform's own fetch step interprets. The loop itself
// owns the stop conditions and the politeness delay; platforms only
// describe how to fetch one page and how to normalize one item.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::item::UnifiedItem;
use crate::task::TaskHandle;

/// Fixed delay between successive page fetches. Not configurable — it is
/// the rate-limit politeness floor for every aggregator endpoint.
pub const PAGE_DELAY: Duration = Duration::from_millis(1500);

/// Opaque pagination position. Which variant a platform uses is its own
/// business; the loop just threads the value back into the next fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Integer offset (e.g. item offset or millisecond watermark).
    Offset(u64),
    /// 1-based page number.
    Page(u32),
    /// Opaque continuation token.
    Token(String),
}

/// One fetched page of raw items.
///
/// `next: None` means the API stopped handing out cursors — pagination
/// ends even if `has_more` claims otherwise.
pub struct RawPage {
    pub items: Vec<Value>,
    pub next: Option<Cursor>,
    pub has_more: bool,
}

/// A platform's stateless paging step: fetch one page at a cursor, and
/// turn one raw item into the unified schema (None = drop silently).
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage>;
    fn normalize(&self, raw: &Value) -> Option<UnifiedItem>;
}

/// Drive a page source to exhaustion or the item cap, appending normalized
/// items to the task as they arrive. Returns how many items were appended
/// by this run.
///
/// Stop conditions, first one wins:
///   - the fetch step errors (treated as end-of-tier, not surfaced),
///   - the page comes back empty (regardless of the API's has_more flag —
///     inconsistent APIs otherwise loop forever),
///   - the item cap is reached (`cap` counts the task's cumulative total,
///     so supplementary passes share one budget),
///   - has_more is false or the cursor ran out.
///
/// The fetch step is never called again after any of these fire.
pub async fn drive(source: &dyn PageSource, task: &TaskHandle, cap: usize) -> usize {
    let mut total = task.total().await;
    if cap > 0 && total >= cap {
        return 0;
    }

    let mut appended = 0usize;
    let mut cursor: Option<Cursor> = None;
    let mut page = 0u32;

    loop {
        page += 1;
        task.set_message(&format!("Page {page}… ({total} items)")).await;

        let fetched = match source.fetch_page(cursor.as_ref()).await {
            Ok(p) => p,
            Err(e) => {
                debug!(page, error = %e, "page fetch failed, ending pagination");
                break;
            }
        };
        if fetched.items.is_empty() {
            break;
        }

        let mut capped = false;
        for raw in &fetched.items {
            if let Some(item) = source.normalize(raw) {
                total = task.push_item(item).await;
                appended += 1;
                if cap > 0 && total >= cap {
                    capped = true;
                    break;
                }
            }
        }
        if capped || !fetched.has_more {
            break;
        }
        let Some(next) = fetched.next else { break };
        cursor = Some(next);

        tokio::time::sleep(PAGE_DELAY).await;
    }

    appended
}
