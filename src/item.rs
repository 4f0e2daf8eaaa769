// Platform-agnostic content model.
//
// Every upstream API shape — aggregator endpoints and extractor entries
// alike — normalizes into UnifiedItem before it reaches a task record.
// Normalizers live next to their platform's fetch code; this module holds
// the shared types and the string bounds they must respect.

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Longest title/bio the unified schema carries. Upstream captions can be
/// arbitrarily long; anything past this is cut at a char boundary.
pub const MAX_TEXT_CHARS: usize = 200;

/// What kind of content an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Video,
    Photo,
    Reel,
}

/// One piece of content (video, photo, post) in platform-agnostic form.
///
/// `id` is platform-local and always non-empty — normalizers drop items
/// whose identity cannot be resolved rather than emit a blank id. Counts
/// default to 0 when the source lacks the field; `create_time` is epoch
/// seconds with 0 meaning unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub duration: u64,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub share_count: u64,
    pub create_time: i64,
    pub author: String,
    pub platform: Platform,
    #[serde(rename = "type")]
    pub kind: ItemKind,
}

/// The grabbed account, created once per task before pagination begins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub nickname: String,
    pub username: String,
    pub avatar: String,
    pub signature: String,
    pub followers: u64,
    pub following: u64,
    pub likes: u64,
    pub video_count: u64,
}

impl ProfileInfo {
    /// Best-effort profile used when no API resolves the account: the
    /// identifier echoed into the name fields, all counts zero.
    pub fn fallback(nickname: &str, username: &str) -> Self {
        Self {
            nickname: nickname.to_string(),
            username: username.to_string(),
            ..Self::default()
        }
    }
}

/// Cut a string to at most `max_chars` characters, never splitting a char.
/// Byte-index slicing would panic mid-codepoint on CJK captions and emoji.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
