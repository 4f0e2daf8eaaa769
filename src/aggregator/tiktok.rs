// TikTok — aggregator Web API tier.
//
// Identity is the opaque `secUid`. Profile URLs carry the handle, which
// the profile endpoint maps to a secUid; share links without a handle go
// through the dedicated resolver endpoint instead.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::client::HubClient;
use super::{bool_of, id_of, num_of, str_of};
use crate::grab::pager::{drive, Cursor, PageSource, RawPage};
use crate::grab::{GrabContext, GrabTier, TierOutcome};
use crate::item::{truncate_chars, ItemKind, ProfileInfo, UnifiedItem, MAX_TEXT_CHARS};
use crate::platform::Platform;
use crate::task::GrabStatus;

const PAGE_SIZE: u32 = 35;

/// Convert one aggregator TikTok item to the unified schema.
pub fn normalize_item(item: &Value) -> Option<UnifiedItem> {
    let id = id_of(item, &["id"]);
    if id.is_empty() {
        return None;
    }
    let video = item.get("video").unwrap_or(&Value::Null);
    let stats = item.get("stats").unwrap_or(&Value::Null);
    let author = item.get("author").unwrap_or(&Value::Null);

    let unique_id = str_of(author, &["uniqueId"]);
    let url = if unique_id.is_empty() {
        String::new()
    } else {
        format!("https://www.tiktok.com/@{unique_id}/video/{id}")
    };
    let title = truncate_chars(&str_of(item, &["desc"]), MAX_TEXT_CHARS);
    let author_name = {
        let nickname = str_of(author, &["nickname"]);
        if nickname.is_empty() {
            unique_id
        } else {
            nickname
        }
    };

    Some(UnifiedItem {
        id,
        title: if title.is_empty() { "Video".to_string() } else { title },
        url,
        thumbnail: str_of(video, &["cover", "dynamicCover", "originCover"]),
        duration: num_of(video, &["duration"]),
        view_count: num_of(stats, &["playCount"]),
        like_count: num_of(stats, &["diggCount"]),
        comment_count: num_of(stats, &["commentCount"]),
        share_count: num_of(stats, &["shareCount"]),
        create_time: num_of(item, &["createTime"]) as i64,
        author: author_name,
        platform: Platform::TikTok,
        kind: ItemKind::Video,
    })
}

/// Pull `(secUid, profile)` out of the user-profile endpoint's payload.
fn parse_profile(data: &Value, username: &str) -> (String, ProfileInfo) {
    let user_info = data.get("userInfo").unwrap_or(data);
    let user = user_info.get("user").unwrap_or(&Value::Null);
    let stats = user_info.get("stats").unwrap_or(&Value::Null);

    let sec_uid = str_of(user, &["secUid"]);
    let profile = ProfileInfo {
        nickname: {
            let n = str_of(user, &["nickname"]);
            if n.is_empty() { username.to_string() } else { n }
        },
        username: {
            let u = str_of(user, &["uniqueId"]);
            if u.is_empty() { username.to_string() } else { u }
        },
        avatar: str_of(user, &["avatarLarger", "avatarMedium"]),
        signature: truncate_chars(&str_of(user, &["signature"]), MAX_TEXT_CHARS),
        followers: num_of(stats, &["followerCount"]),
        following: num_of(stats, &["followingCount"]),
        likes: num_of(stats, &["heartCount", "heart"]),
        video_count: num_of(stats, &["videoCount"]),
    };
    (sec_uid, profile)
}

struct TikTokPager<'a> {
    client: &'a HubClient,
    sec_uid: String,
}

#[async_trait]
impl PageSource for TikTokPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let offset = match cursor {
            Some(Cursor::Offset(n)) => *n,
            _ => 0,
        };
        let data = self
            .client
            .get_data(
                "/api/v1/tiktok/web/fetch_user_post",
                &[
                    ("secUid", self.sec_uid.clone()),
                    ("cursor", offset.to_string()),
                    ("count", PAGE_SIZE.to_string()),
                    ("coverFormat", "2".to_string()),
                ],
            )
            .await
            .ok_or_else(|| anyhow!("user-post endpoint returned no data"))?;

        let items = super::list_of(&data, &["itemList", "aweme_list"]);
        let has_more = bool_of(&data, &["hasMore", "has_more"]);
        // The next cursor is an item offset; 0 or missing means exhausted.
        let next = match data.get("cursor") {
            Some(Value::Number(n)) => n.as_u64().filter(|c| *c > 0).map(Cursor::Offset),
            Some(Value::String(s)) => s.parse::<u64>().ok().filter(|c| *c > 0).map(Cursor::Offset),
            _ => None,
        };
        Ok(RawPage { items, next, has_more })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw)
    }
}

pub struct TikTokTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for TikTokTier {
    fn name(&self) -> &'static str {
        "tiktok-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(GrabStatus::GettingProfile, "Fetching TikTok profile…")
            .await;

        let mut sec_uid = String::new();
        let mut profile: Option<ProfileInfo> = None;

        if let Some(username) = &ctx.username {
            if let Some(data) = self
                .client
                .get_data(
                    "/api/v1/tiktok/web/fetch_user_profile",
                    &[("uniqueId", username.clone())],
                )
                .await
            {
                let (uid, info) = parse_profile(&data, username);
                sec_uid = uid;
                profile = Some(info);
            }
        }
        if sec_uid.is_empty() {
            if let Some(data) = self
                .client
                .get_data("/api/v1/tiktok/web/get_sec_user_id", &[("url", ctx.url.clone())])
                .await
            {
                sec_uid = data.as_str().unwrap_or_default().to_string();
            }
        }
        if sec_uid.is_empty() {
            return TierOutcome::Failed("could not resolve TikTok account id".to_string());
        }

        let display = ctx.username.clone().unwrap_or_else(|| "Unknown".to_string());
        task.set_profile(profile.unwrap_or_else(|| ProfileInfo::fallback(&display, &sec_uid)))
            .await;
        task.set_status(GrabStatus::Grabbing, "Fetching videos…").await;

        let pager = TikTokPager {
            client: &self.client,
            sec_uid,
        };
        let appended = drive(&pager, task, ctx.max_items).await;
        if appended == 0 {
            TierOutcome::Empty
        } else {
            TierOutcome::Grabbed(appended)
        }
    }
}
