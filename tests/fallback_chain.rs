// Fallback chain tests — scripted tiers, no network.
//
// The chain's contract: tiers run in order, the first Grabbed outcome is
// terminal-completed, Empty and Failed both fall through, and exhausting
// every tier is terminal-error with a non-empty message and an empty
// (not null) item list.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use magpie::aggregator::client::HubClient;
use magpie::extractor::MediaExtractor;
use magpie::grab::{run_chain, tiers_for, GrabContext, GrabTier, TierOutcome};
use magpie::item::{ItemKind, UnifiedItem};
use magpie::platform::Platform;
use magpie::task::{GrabStatus, ProfileTask, TaskHandle, TaskStore};

enum Plan {
    Grab(usize),
    Empty,
    Fail,
}

struct ScriptedTier {
    plan: Plan,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTier {
    fn boxed(plan: Plan) -> (Box<dyn GrabTier>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Self {
                plan,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

fn dummy_item(id: usize) -> UnifiedItem {
    UnifiedItem {
        id: format!("item-{id}"),
        title: "t".to_string(),
        url: String::new(),
        thumbnail: String::new(),
        duration: 0,
        view_count: 0,
        like_count: 0,
        comment_count: 0,
        share_count: 0,
        create_time: 0,
        author: String::new(),
        platform: Platform::TikTok,
        kind: ItemKind::Video,
    }
}

#[async_trait]
impl GrabTier for ScriptedTier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.plan {
            Plan::Grab(n) => {
                for i in 0..n {
                    ctx.task.push_item(dummy_item(i)).await;
                }
                TierOutcome::Grabbed(n)
            }
            Plan::Empty => TierOutcome::Empty,
            Plan::Fail => TierOutcome::Failed("scripted failure".to_string()),
        }
    }
}

async fn fresh_ctx() -> (Arc<TaskStore>, GrabContext) {
    let store = Arc::new(TaskStore::new(chrono::Duration::hours(6)));
    let url = "https://www.tiktok.com/@alice";
    let id = store
        .create(ProfileTask::new(url, Platform::TikTok))
        .await;
    let ctx = GrabContext {
        url: url.to_string(),
        platform: Platform::TikTok,
        username: Some("alice".to_string()),
        max_items: 0,
        task: TaskHandle::new(store.clone(), id),
    };
    (store, ctx)
}

// ============================================================
// Ordering and short-circuit
// ============================================================

#[tokio::test]
async fn first_grab_wins_and_later_tiers_never_run() {
    let (t1, c1) = ScriptedTier::boxed(Plan::Grab(2));
    let (t2, c2) = ScriptedTier::boxed(Plan::Grab(5));
    let (_store, ctx) = fresh_ctx().await;

    run_chain(&ctx, &[t1, t2]).await;

    assert_eq!(c1.load(Ordering::SeqCst), 1);
    assert_eq!(c2.load(Ordering::SeqCst), 0);

    let task = ctx.task.snapshot().await.unwrap();
    assert_eq!(task.status, GrabStatus::Completed);
    assert_eq!(task.total, 2);
}

#[tokio::test]
async fn failed_and_empty_both_fall_through() {
    let (t1, c1) = ScriptedTier::boxed(Plan::Fail);
    let (t2, c2) = ScriptedTier::boxed(Plan::Empty);
    let (t3, c3) = ScriptedTier::boxed(Plan::Grab(1));
    let (_store, ctx) = fresh_ctx().await;

    run_chain(&ctx, &[t1, t2, t3]).await;

    assert_eq!(c1.load(Ordering::SeqCst), 1);
    assert_eq!(c2.load(Ordering::SeqCst), 1);
    assert_eq!(c3.load(Ordering::SeqCst), 1);
    assert_eq!(
        ctx.task.snapshot().await.unwrap().status,
        GrabStatus::Completed
    );
}

// ============================================================
// Exhaustion
// ============================================================

#[tokio::test]
async fn exhausting_all_tiers_is_terminal_error() {
    let (t1, _) = ScriptedTier::boxed(Plan::Fail);
    let (t2, _) = ScriptedTier::boxed(Plan::Empty);
    let (_store, ctx) = fresh_ctx().await;

    run_chain(&ctx, &[t1, t2]).await;

    let task = ctx.task.snapshot().await.unwrap();
    assert_eq!(task.status, GrabStatus::Error);
    assert!(!task.message.is_empty());
    // Empty sequence, not a missing one.
    assert!(task.videos.is_empty());
    assert_eq!(task.total, 0);
}

#[tokio::test]
async fn empty_chain_is_terminal_error() {
    let (_store, ctx) = fresh_ctx().await;
    run_chain(&ctx, &[]).await;
    assert_eq!(ctx.task.snapshot().await.unwrap().status, GrabStatus::Error);
}

// ============================================================
// Completion metadata
// ============================================================

#[tokio::test]
async fn completion_message_names_the_item_count() {
    let (t1, _) = ScriptedTier::boxed(Plan::Grab(7));
    let (_store, ctx) = fresh_ctx().await;

    run_chain(&ctx, &[t1]).await;

    let task = ctx.task.snapshot().await.unwrap();
    assert!(task.message.contains('7'), "message: {}", task.message);
}

// ============================================================
// Chain composition
// ============================================================

#[test]
fn api_platforms_chain_api_then_extractor() {
    let hub = Arc::new(HubClient::new("http://127.0.0.1:9", "").unwrap());
    let extractor = Arc::new(MediaExtractor::new(
        "yt-dlp".into(),
        std::time::Duration::from_secs(5),
    ));

    let tiers = tiers_for(Platform::TikTok, hub.clone(), extractor.clone());
    let names: Vec<&str> = tiers.iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["tiktok-api", "extractor"]);

    let tiers = tiers_for(Platform::Instagram, hub.clone(), extractor.clone());
    let names: Vec<&str> = tiers.iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["instagram-api", "extractor"]);

    // No aggregator coverage — extractor only.
    let tiers = tiers_for(Platform::Pinterest, hub, extractor);
    let names: Vec<&str> = tiers.iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["extractor"]);
}
