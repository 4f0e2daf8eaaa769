// Fallback-chain orchestration for profile grabs.
//
// A grab runs an ordered list of source tiers — the platform's aggregator
// API first, the generic extractor last — until one of them produces
// items. Tier results are a tagged outcome, not exceptions: the chain and
// its termination condition are visible as data.
//
// Failures never propagate out of a tier. The only caller-visible failure
// channel is the task record's status and message.

pub mod pager;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::aggregator::client::HubClient;
use crate::aggregator::{
    bilibili::BilibiliTier, douyin::DouyinTier, instagram::InstagramTier,
    kuaishou::KuaishouTier, reddit::RedditTier, threads::ThreadsTier, tiktok::TikTokTier,
    twitter::TwitterTier, weibo::WeiboTier, xiaohongshu::XiaohongshuTier,
};
use crate::extractor::{ExtractorTier, MediaExtractor};
use crate::platform::Platform;
use crate::task::TaskHandle;

/// Everything a source tier needs to run one grab.
pub struct GrabContext {
    /// The URL as submitted by the client.
    pub url: String,
    pub platform: Platform,
    /// Username extracted from the URL, when the URL carries one.
    pub username: Option<String>,
    /// Item cap; 0 = unlimited.
    pub max_items: usize,
    pub task: TaskHandle,
}

/// What one tier made of the grab.
pub enum TierOutcome {
    /// The tier appended this many items; the chain stops here.
    Grabbed(usize),
    /// The tier ran to completion but found nothing; try the next tier.
    Empty,
    /// The tier could not run — identity unresolved, API dead. Try the
    /// next tier; the reason is only logged.
    Failed(String),
}

/// One strategy for grabbing a profile: resolve identity, fetch profile
/// info (best effort — its failure must never block pagination), then
/// paginate items into the task.
#[async_trait]
pub trait GrabTier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, ctx: &GrabContext) -> TierOutcome;
}

/// The per-platform fallback chain, as data. Aggregator-backed platforms
/// get their API tier first; everything falls back to the generic
/// extractor, which also serves the platforms with no API coverage.
pub fn tiers_for(
    platform: Platform,
    hub: Arc<HubClient>,
    extractor: Arc<MediaExtractor>,
) -> Vec<Box<dyn GrabTier>> {
    let mut tiers: Vec<Box<dyn GrabTier>> = Vec::new();
    match platform {
        Platform::TikTok => tiers.push(Box::new(TikTokTier { client: hub })),
        Platform::Douyin => tiers.push(Box::new(DouyinTier { client: hub })),
        Platform::Instagram => tiers.push(Box::new(InstagramTier { client: hub })),
        Platform::Xiaohongshu => tiers.push(Box::new(XiaohongshuTier { client: hub })),
        Platform::Bilibili => tiers.push(Box::new(BilibiliTier { client: hub })),
        Platform::Weibo => tiers.push(Box::new(WeiboTier { client: hub })),
        Platform::Twitter => tiers.push(Box::new(TwitterTier { client: hub })),
        Platform::Threads => tiers.push(Box::new(ThreadsTier { client: hub })),
        Platform::Kuaishou => tiers.push(Box::new(KuaishouTier { client: hub })),
        Platform::Reddit => tiers.push(Box::new(RedditTier { client: hub })),
        _ => {}
    }
    tiers.push(Box::new(ExtractorTier { extractor }));
    tiers
}

/// Run the chain to a terminal task status.
///
/// Tiers run in order until one grabs something. Partial items appended by
/// a tier that later stalled are kept — they are what made the tier count
/// as Grabbed in the first place. Exhausting every tier marks the task
/// failed with a human-readable message; whatever was appended stays.
pub async fn run_chain(ctx: &GrabContext, tiers: &[Box<dyn GrabTier>]) {
    for tier in tiers {
        debug!(tier = tier.name(), platform = %ctx.platform, "trying source tier");
        match tier.run(ctx).await {
            TierOutcome::Grabbed(n) => {
                info!(tier = tier.name(), items = n, platform = %ctx.platform, "grab completed");
                ctx.task
                    .complete(&format!("Found {n} items (via {})", tier.name()))
                    .await;
                return;
            }
            TierOutcome::Empty => {
                info!(tier = tier.name(), "tier found nothing, falling through");
            }
            TierOutcome::Failed(reason) => {
                warn!(tier = tier.name(), reason = %reason, "tier failed, falling through");
            }
        }
    }
    ctx.task
        .fail("No content found for this profile. Check the URL and try again.")
        .await;
}
