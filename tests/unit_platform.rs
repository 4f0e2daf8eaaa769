// Unit tests for URL resolution.
//
// The resolver is pure and total: same URL in, same platform and
// username out, and unrecognized input is None — never a panic.

use magpie::platform::{extract_username, is_profile_url, Platform, ALL_PLATFORMS};

// ============================================================
// Platform::detect
// ============================================================

#[test]
fn detect_tiktok() {
    assert_eq!(
        Platform::detect("https://www.tiktok.com/@alice"),
        Some(Platform::TikTok)
    );
}

#[test]
fn detect_youtube_short_domain() {
    assert_eq!(
        Platform::detect("https://youtu.be/dQw4w9WgXcQ"),
        Some(Platform::YouTube)
    );
}

#[test]
fn detect_twitter_both_domains() {
    assert_eq!(
        Platform::detect("https://twitter.com/jack"),
        Some(Platform::Twitter)
    );
    assert_eq!(Platform::detect("https://x.com/jack"), Some(Platform::Twitter));
}

#[test]
fn detect_bilibili_space() {
    assert_eq!(
        Platform::detect("https://space.bilibili.com/12345"),
        Some(Platform::Bilibili)
    );
}

#[test]
fn detect_sora_share_link() {
    assert_eq!(
        Platform::detect("https://sora.chatgpt.com/p/s_abc123"),
        Some(Platform::Sora)
    );
}

#[test]
fn detect_is_case_insensitive() {
    assert_eq!(
        Platform::detect("HTTPS://WWW.TIKTOK.COM/@Alice"),
        Some(Platform::TikTok)
    );
}

#[test]
fn detect_unrecognized_is_none() {
    assert_eq!(Platform::detect("https://example.com/some/page"), None);
}

#[test]
fn detect_is_idempotent() {
    let url = "https://www.instagram.com/natgeo/";
    let first = Platform::detect(url);
    let second = Platform::detect(url);
    assert_eq!(first, second);
    assert_eq!(first, Some(Platform::Instagram));
}

// ============================================================
// extract_username
// ============================================================

#[test]
fn username_tiktok_handle() {
    assert_eq!(
        extract_username("https://www.tiktok.com/@alice", Platform::TikTok),
        Some("alice".to_string())
    );
}

#[test]
fn username_youtube_all_path_styles() {
    for url in [
        "https://www.youtube.com/@somechannel",
        "https://www.youtube.com/c/somechannel",
        "https://www.youtube.com/channel/somechannel",
        "https://www.youtube.com/user/somechannel",
    ] {
        assert_eq!(
            extract_username(url, Platform::YouTube),
            Some("somechannel".to_string()),
            "failed for {url}"
        );
    }
}

#[test]
fn username_bilibili_is_numeric_space_id() {
    assert_eq!(
        extract_username("https://space.bilibili.com/672328094", Platform::Bilibili),
        Some("672328094".to_string())
    );
}

#[test]
fn username_reddit_user_and_subreddit() {
    assert_eq!(
        extract_username("https://www.reddit.com/user/spez", Platform::Reddit),
        Some("spez".to_string())
    );
    assert_eq!(
        extract_username("https://www.reddit.com/r/rust", Platform::Reddit),
        Some("rust".to_string())
    );
}

#[test]
fn username_unmatched_is_none() {
    assert_eq!(
        extract_username("https://www.tiktok.com/video/123", Platform::TikTok),
        None
    );
}

#[test]
fn username_douyin_share_links_have_none() {
    // Douyin share links hide the id behind a redirect; the grabber
    // resolves it, not the URL pattern.
    assert_eq!(
        extract_username("https://v.douyin.com/abc123/", Platform::Douyin),
        None
    );
}

#[test]
fn username_is_idempotent() {
    let url = "https://x.com/jack";
    assert_eq!(
        extract_username(url, Platform::Twitter),
        extract_username(url, Platform::Twitter)
    );
}

// ============================================================
// is_profile_url
// ============================================================

#[test]
fn profile_url_tiktok() {
    assert!(is_profile_url("https://www.tiktok.com/@alice"));
    assert!(!is_profile_url("https://www.tiktok.com/@alice/video/724"));
}

#[test]
fn profile_url_reddit_subreddit() {
    assert!(is_profile_url("https://www.reddit.com/r/rust"));
}

#[test]
fn profile_url_unknown_platform_is_false() {
    assert!(!is_profile_url("https://example.com/@alice"));
}

// ============================================================
// Identifiers and serialization
// ============================================================

#[test]
fn all_platforms_have_distinct_ids() {
    let mut ids: Vec<&str> = ALL_PLATFORMS.iter().map(|p| p.as_str()).collect();
    let before = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(before, ids.len());
    assert_eq!(before, 19);
}

#[test]
fn platform_serializes_as_lowercase_id() {
    let v = serde_json::to_value(Platform::Xiaohongshu).unwrap();
    assert_eq!(v, serde_json::json!("xiaohongshu"));
}
