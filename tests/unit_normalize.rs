// Unit tests for the per-platform item normalizers.
//
// Contract under test: every normalizer returns either a well-formed
// UnifiedItem (non-empty id, bounded title, non-negative counts) or None
// — never a panic, never a partially-filled item.

use magpie::aggregator::{
    bilibili, douyin, instagram, kuaishou, reddit, threads, tiktok, twitter, weibo, xiaohongshu,
};
use magpie::item::{truncate_chars, ItemKind};
use serde_json::json;

// ============================================================
// TikTok
// ============================================================

#[test]
fn tiktok_full_item() {
    let raw = json!({
        "id": "7240000000000000000",
        "desc": "a video about things",
        "createTime": 1700000000,
        "video": {"cover": "https://cdn/c.jpg", "duration": 30},
        "stats": {"playCount": 1000, "diggCount": 100, "commentCount": 10, "shareCount": 5},
        "author": {"uniqueId": "alice", "nickname": "Alice"},
    });
    let item = tiktok::normalize_item(&raw).unwrap();
    assert_eq!(item.id, "7240000000000000000");
    assert_eq!(item.title, "a video about things");
    assert_eq!(
        item.url,
        "https://www.tiktok.com/@alice/video/7240000000000000000"
    );
    assert_eq!(item.duration, 30);
    assert_eq!(item.view_count, 1000);
    assert_eq!(item.like_count, 100);
    assert_eq!(item.comment_count, 10);
    assert_eq!(item.share_count, 5);
    assert_eq!(item.create_time, 1700000000);
    assert_eq!(item.author, "Alice");
    assert_eq!(item.kind, ItemKind::Video);
}

#[test]
fn tiktok_missing_stats_default_to_zero() {
    let raw = json!({"id": "7", "desc": "x"});
    let item = tiktok::normalize_item(&raw).unwrap();
    assert_eq!(item.view_count, 0);
    assert_eq!(item.like_count, 0);
    assert_eq!(item.duration, 0);
    assert_eq!(item.url, "");
}

#[test]
fn tiktok_missing_id_is_dropped() {
    assert!(tiktok::normalize_item(&json!({"desc": "no id here"})).is_none());
    assert!(tiktok::normalize_item(&json!({"id": "", "desc": "blank id"})).is_none());
}

#[test]
fn tiktok_title_is_char_bounded() {
    let long = "汉".repeat(500);
    let raw = json!({"id": "7", "desc": long});
    let item = tiktok::normalize_item(&raw).unwrap();
    assert_eq!(item.title.chars().count(), 200);
}

#[test]
fn tiktok_negative_counts_clamp_to_zero() {
    let raw = json!({"id": "7", "stats": {"playCount": -50}});
    let item = tiktok::normalize_item(&raw).unwrap();
    assert_eq!(item.view_count, 0);
}

// ============================================================
// Douyin
// ============================================================

#[test]
fn douyin_millisecond_duration_becomes_seconds() {
    let raw = json!({
        "aweme_id": "123",
        "desc": "v",
        "video": {"duration": 15000, "cover": {"url_list": ["https://cdn/a.jpg"]}},
        "statistics": {"play_count": 9, "digg_count": 3},
        "author": {"nickname": "某人"},
    });
    let item = douyin::normalize_item(&raw).unwrap();
    assert_eq!(item.duration, 15);
    assert_eq!(item.thumbnail, "https://cdn/a.jpg");
    assert_eq!(item.url, "https://www.douyin.com/video/123");
    assert_eq!(item.author, "某人");
}

#[test]
fn douyin_legacy_second_duration_kept() {
    let raw = json!({"aweme_id": "1", "video": {"duration": 45}});
    assert_eq!(douyin::normalize_item(&raw).unwrap().duration, 45);
}

// ============================================================
// Instagram — App and Web shapes through one normalizer
// ============================================================

#[test]
fn instagram_app_shape_clip_is_reel() {
    let raw = json!({
        "pk": 3100000000000000000u64,
        "code": "CxYz12",
        "product_type": "clips",
        "media_type": 2,
        "caption": {"text": "reel caption"},
        "image_versions2": {"candidates": [{"url": "https://ig/c0.jpg"}]},
        "like_count": 42,
        "comment_count": 7,
        "play_count": 900,
        "taken_at": 1690000000,
        "user": {"username": "bob", "full_name": "Bob"},
    });
    let item = instagram::normalize_item(&raw).unwrap();
    assert_eq!(item.id, "3100000000000000000");
    assert_eq!(item.kind, ItemKind::Reel);
    assert_eq!(item.url, "https://www.instagram.com/p/CxYz12/");
    assert_eq!(item.thumbnail, "https://ig/c0.jpg");
    assert_eq!(item.view_count, 900);
    assert_eq!(item.author, "Bob");
}

#[test]
fn instagram_web_shape_uses_edge_aliases() {
    let raw = json!({
        "id": "998",
        "shortcode": "Cabc",
        "is_video": false,
        "caption": "plain string caption",
        "display_url": "https://ig/d.jpg",
        "edge_media_preview_like": {"count": 11},
        "edge_media_to_comment": {"count": 4},
        "taken_at_timestamp": 1680000000,
        "owner": {"username": "carol"},
    });
    let item = instagram::normalize_item(&raw).unwrap();
    assert_eq!(item.kind, ItemKind::Photo);
    assert_eq!(item.title, "plain string caption");
    assert_eq!(item.like_count, 11);
    assert_eq!(item.comment_count, 4);
    assert_eq!(item.create_time, 1680000000);
    assert_eq!(item.thumbnail, "https://ig/d.jpg");
}

#[test]
fn instagram_unresolvable_identity_is_dropped() {
    assert!(instagram::normalize_item(&json!({"caption": "nothing else"})).is_none());
}

// ============================================================
// Weibo
// ============================================================

#[test]
fn weibo_html_is_stripped_from_text() {
    let raw = json!({
        "mid": "481",
        "text": "hello <a href=\"/x\">world</a> &amp; more",
        "attitudes_count": 3,
        "user": {"id": 777, "screen_name": "微博用户"},
    });
    let item = weibo::normalize_item(&raw).unwrap();
    assert_eq!(item.title, "hello world & more");
    assert_eq!(item.url, "https://weibo.com/777/481");
    assert_eq!(item.author, "微博用户");
    assert_eq!(item.kind, ItemKind::Photo);
}

#[test]
fn weibo_video_page_info_sets_kind() {
    let raw = json!({
        "id": 482,
        "text_raw": "v",
        "page_info": {"type": "video", "page_pic": {"url": "https://wb/p.jpg"}},
    });
    let item = weibo::normalize_item(&raw).unwrap();
    assert_eq!(item.kind, ItemKind::Video);
    assert_eq!(item.thumbnail, "https://wb/p.jpg");
}

// ============================================================
// Twitter
// ============================================================

#[test]
fn twitter_video_media_sets_kind_and_url() {
    let raw = json!({
        "id_str": "171",
        "full_text": "tweet text",
        "favorite_count": 5,
        "retweet_count": 2,
        "reply_count": 1,
        "extended_entities": {"media": [
            {"type": "video", "media_url_https": "https://tw/m.jpg"}
        ]},
        "user": {"screen_name": "jack", "name": "Jack"},
    });
    let item = twitter::normalize_item(&raw).unwrap();
    assert_eq!(item.kind, ItemKind::Video);
    assert_eq!(item.url, "https://x.com/jack/status/171");
    assert_eq!(item.thumbnail, "https://tw/m.jpg");
    assert_eq!(item.share_count, 2);
}

// ============================================================
// Reddit
// ============================================================

#[test]
fn reddit_child_wrapper_and_placeholder_thumbnail() {
    let raw = json!({
        "data": {
            "id": "abc9",
            "title": "a post",
            "thumbnail": "self",
            "permalink": "/r/rust/comments/abc9/a_post/",
            "ups": 120,
            "num_comments": 33,
            "num_crossposts": 2,
            "created_utc": 1700000123.0,
            "author": "spez",
        }
    });
    let item = reddit::normalize_item(&raw, "fallback_user").unwrap();
    assert_eq!(item.id, "abc9");
    assert_eq!(item.thumbnail, "");
    assert_eq!(item.url, "https://www.reddit.com/r/rust/comments/abc9/a_post/");
    assert_eq!(item.like_count, 120);
    assert_eq!(item.create_time, 1700000123);
    assert_eq!(item.author, "spez");
    assert_eq!(item.kind, ItemKind::Photo);
}

#[test]
fn reddit_author_falls_back_to_username() {
    let raw = json!({"id": "x1", "title": "t", "is_video": true});
    let item = reddit::normalize_item(&raw, "someone").unwrap();
    assert_eq!(item.author, "someone");
    assert_eq!(item.kind, ItemKind::Video);
}

#[test]
fn reddit_string_counts_coerce() {
    let raw = json!({"id": "x2", "title": "t", "view_count": "123"});
    assert_eq!(reddit::normalize_item(&raw, "u").unwrap().view_count, 123);
}

// ============================================================
// Bilibili
// ============================================================

#[test]
fn bilibili_count_aliases() {
    let raw = json!({
        "bvid": "BV1xx411c7mD",
        "title": "video",
        "pic": "https://bili/p.jpg",
        "play": 5000,
        "comment": 12,
        "created": 1650000000,
        "author": "up主",
    });
    let item = bilibili::normalize_item(&raw).unwrap();
    assert_eq!(item.id, "BV1xx411c7mD");
    assert_eq!(item.view_count, 5000);
    assert_eq!(item.comment_count, 12);
    assert_eq!(item.url, "https://www.bilibili.com/video/BV1xx411c7mD");
}

#[test]
fn bilibili_stat_object_aliases() {
    let raw = json!({
        "aid": 170001,
        "title": "video",
        "stat": {"view": 777, "like": 66, "reply": 5, "share": 4},
        "owner": {"name": "someone"},
    });
    let item = bilibili::normalize_item(&raw).unwrap();
    assert_eq!(item.id, "170001");
    assert_eq!(item.view_count, 777);
    assert_eq!(item.like_count, 66);
    assert_eq!(item.author, "someone");
    // No bvid — no canonical URL can be built.
    assert_eq!(item.url, "");
}

// ============================================================
// Kuaishou
// ============================================================

#[test]
fn kuaishou_millisecond_duration_and_camel_aliases() {
    let raw = json!({
        "photo_id": "3x9",
        "caption": "clip",
        "duration": 42000,
        "viewCount": 900,
        "likeCount": 80,
        "cover_thumbnail_urls": [{"url": "https://ks/c.jpg"}],
        "timestamp": 1660000000,
    });
    let item = kuaishou::normalize_item(&raw).unwrap();
    assert_eq!(item.duration, 42);
    assert_eq!(item.view_count, 900);
    assert_eq!(item.like_count, 80);
    assert_eq!(item.thumbnail, "https://ks/c.jpg");
    assert_eq!(item.url, "https://www.kuaishou.com/short-video/3x9");
}

// ============================================================
// Threads
// ============================================================

#[test]
fn threads_unwraps_thread_items_and_post() {
    let raw = json!({
        "thread_items": [{
            "post": {
                "pk": 555,
                "code": "Cth1",
                "caption": {"text": "thread text"},
                "like_count": 9,
                "text_post_app_info": {"reply_count": 3},
                "reshare_count": 1,
                "taken_at": 1695000000,
                "video_versions": [{"url": "https://th/v.mp4"}],
            }
        }]
    });
    let item = threads::normalize_item(&raw, "dana").unwrap();
    assert_eq!(item.id, "555");
    assert_eq!(item.title, "thread text");
    assert_eq!(item.url, "https://www.threads.net/@dana/post/Cth1");
    assert_eq!(item.comment_count, 3);
    assert_eq!(item.author, "dana");
    assert_eq!(item.kind, ItemKind::Video);
}

// ============================================================
// Xiaohongshu
// ============================================================

#[test]
fn xiaohongshu_interact_info_counts() {
    let raw = json!({
        "note_id": "64f0",
        "display_title": "note title",
        "type": "video",
        "cover": {"url_default": "https://xhs/c.jpg"},
        "interact_info": {"liked_count": 21, "comment_count": 2, "share_count": 1},
        "time": 1688000000,
        "user": {"nickname": "小红薯"},
    });
    let item = xiaohongshu::normalize_item(&raw).unwrap();
    assert_eq!(item.id, "64f0");
    assert_eq!(item.kind, ItemKind::Video);
    assert_eq!(item.like_count, 21);
    assert_eq!(item.thumbnail, "https://xhs/c.jpg");
    assert_eq!(item.url, "https://www.xiaohongshu.com/explore/64f0");
    assert_eq!(item.author, "小红薯");
}

// ============================================================
// truncate_chars — UTF-8 safety
// ============================================================

#[test]
fn truncate_chars_counts_chars_not_bytes() {
    let text = "🦀".repeat(250);
    let cut = truncate_chars(&text, 200);
    assert_eq!(cut.chars().count(), 200);
}

#[test]
fn truncate_chars_leaves_short_text_alone() {
    assert_eq!(truncate_chars("short", 200), "short");
}
