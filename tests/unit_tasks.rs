// Task registry tests — creation, snapshots, the single update entry
// point, and the eviction sweep.

use std::sync::Arc;

use magpie::item::ProfileInfo;
use magpie::platform::Platform;
use magpie::task::{GrabStatus, ProfileTask, TaskHandle, TaskStore};

fn store() -> Arc<TaskStore> {
    Arc::new(TaskStore::new(chrono::Duration::hours(6)))
}

#[tokio::test]
async fn create_returns_short_id_and_starting_record() {
    let store = store();
    let id = store
        .create(ProfileTask::new("https://x.com/jack", Platform::Twitter))
        .await;

    assert_eq!(id.len(), 8);
    let task = store.get(&id).await.unwrap();
    assert_eq!(task.status, GrabStatus::Starting);
    assert_eq!(task.total, 0);
    assert!(task.videos.is_empty());
    assert_eq!(task.platform, Platform::Twitter);
    assert_eq!(task.url, "https://x.com/jack");
}

#[tokio::test]
async fn unknown_id_is_none_not_error() {
    assert!(store().get("deadbeef").await.is_none());
}

#[tokio::test]
async fn ids_are_unique_across_creates() {
    let store = store();
    let a = store
        .create(ProfileTask::new("https://x.com/a", Platform::Twitter))
        .await;
    let b = store
        .create(ProfileTask::new("https://x.com/b", Platform::Twitter))
        .await;
    assert_ne!(a, b);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn handle_mutations_are_visible_to_readers() {
    let store = store();
    let id = store
        .create(ProfileTask::new(
            "https://www.tiktok.com/@alice",
            Platform::TikTok,
        ))
        .await;
    let handle = TaskHandle::new(store.clone(), id.clone());

    handle
        .set_status(GrabStatus::GettingProfile, "Fetching profile…")
        .await;
    handle
        .set_profile(ProfileInfo::fallback("Alice", "alice"))
        .await;

    let task = store.get(&id).await.unwrap();
    assert_eq!(task.status, GrabStatus::GettingProfile);
    assert_eq!(task.message, "Fetching profile…");
    assert_eq!(task.profile.unwrap().nickname, "Alice");
}

#[tokio::test]
async fn update_on_missing_id_is_a_noop() {
    let store = store();
    // The worker of an evicted task writes into the void, not a panic.
    store.update("gone0000", |t| t.total = 99).await;
    assert!(store.get("gone0000").await.is_none());
}

#[tokio::test]
async fn eviction_drops_only_stale_records() {
    let store = store();
    let old = store
        .create(ProfileTask::new("https://x.com/old", Platform::Twitter))
        .await;
    let fresh = store
        .create(ProfileTask::new("https://x.com/fresh", Platform::Twitter))
        .await;

    // Backdate one record past the TTL.
    store
        .update(&old, |t| {
            t.created_at = chrono::Utc::now() - chrono::Duration::hours(7);
        })
        .await;
    store.evict_older_than(chrono::Duration::hours(6)).await;

    assert!(store.get(&old).await.is_none());
    assert!(store.get(&fresh).await.is_some());
}

#[tokio::test]
async fn create_sweeps_expired_records() {
    let store = store();
    let old = store
        .create(ProfileTask::new("https://x.com/old", Platform::Twitter))
        .await;
    store
        .update(&old, |t| {
            t.created_at = chrono::Utc::now() - chrono::Duration::hours(7);
        })
        .await;

    // The next create runs the lazy sweep.
    store
        .create(ProfileTask::new("https://x.com/new", Platform::Twitter))
        .await;
    assert!(store.get(&old).await.is_none());
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn push_item_keeps_total_in_sync() {
    let store = store();
    let id = store
        .create(ProfileTask::new(
            "https://www.tiktok.com/@alice",
            Platform::TikTok,
        ))
        .await;
    let handle = TaskHandle::new(store.clone(), id.clone());

    for i in 0..3 {
        let item = magpie::item::UnifiedItem {
            id: format!("v{i}"),
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
            kind: magpie::item::ItemKind::Video,
        };
        let total = handle.push_item(item).await;
        assert_eq!(total, i + 1);
        assert_eq!(store.get(&id).await.unwrap().total, i + 1);
    }

    let ids = handle.item_ids().await;
    assert_eq!(ids.len(), 3);
    assert!(ids.contains("v0"));
}
