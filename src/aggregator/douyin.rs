// Douyin — aggregator Web API tier.
//
// Identity is the `sec_user_id` from the profile URL path. Share links
// (v.douyin.com) hide it behind a redirect, so the tier follows the hop
// and re-applies the pattern to the final URL.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use serde_json::Value;

use super::client::HubClient;
use super::{bool_of, id_of, num_of, str_of};
use crate::grab::pager::{drive, Cursor, PageSource, RawPage};
use crate::grab::{GrabContext, GrabTier, TierOutcome};
use crate::item::{truncate_chars, ItemKind, ProfileInfo, UnifiedItem, MAX_TEXT_CHARS};
use crate::platform::Platform;
use crate::task::GrabStatus;

const PAGE_SIZE: u32 = 20;

fn sec_user_id_from(url: &str) -> Option<String> {
    let re = Regex::new(r"douyin\.com/user/([\w-]+)").ok()?;
    re.captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Convert one aggregator Douyin item to the unified schema.
pub fn normalize_item(item: &Value) -> Option<UnifiedItem> {
    let id = id_of(item, &["aweme_id"]);
    if id.is_empty() {
        return None;
    }
    let video = item.get("video").unwrap_or(&Value::Null);
    let stats = item.get("statistics").unwrap_or(&Value::Null);
    let author = item.get("author").unwrap_or(&Value::Null);

    // Covers arrive as {url_list: [...]} objects.
    let thumbnail = ["cover", "origin_cover"]
        .iter()
        .find_map(|k| {
            video
                .get(*k)
                .and_then(|c| c.get("url_list"))
                .and_then(Value::as_array)
                .and_then(|urls| urls.first())
                .and_then(Value::as_str)
        })
        .unwrap_or_default()
        .to_string();

    // Durations are milliseconds on newer responses, seconds on legacy ones.
    let raw_duration = num_of(video, &["duration"]);
    let duration = if raw_duration > 1000 {
        raw_duration / 1000
    } else {
        raw_duration
    };

    let title = truncate_chars(&str_of(item, &["desc"]), MAX_TEXT_CHARS);
    Some(UnifiedItem {
        id: id.clone(),
        title: if title.is_empty() { "Video".to_string() } else { title },
        url: format!("https://www.douyin.com/video/{id}"),
        thumbnail,
        duration,
        view_count: num_of(stats, &["play_count"]),
        like_count: num_of(stats, &["digg_count"]),
        comment_count: num_of(stats, &["comment_count"]),
        share_count: num_of(stats, &["share_count"]),
        create_time: num_of(item, &["create_time"]) as i64,
        author: str_of(author, &["nickname"]),
        platform: Platform::Douyin,
        kind: ItemKind::Video,
    })
}

fn parse_profile(data: &Value, sec_user_id: &str) -> ProfileInfo {
    let user = data.get("user").unwrap_or(&Value::Null);
    let avatar = user
        .get("avatar_larger")
        .and_then(|a| a.get("url_list"))
        .and_then(Value::as_array)
        .and_then(|urls| urls.first())
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let short_id = truncate_chars(sec_user_id, 20);
    ProfileInfo {
        nickname: {
            let n = str_of(user, &["nickname"]);
            if n.is_empty() { "Douyin User".to_string() } else { n }
        },
        username: {
            let u = str_of(user, &["unique_id", "short_id"]);
            if u.is_empty() { short_id } else { u }
        },
        avatar,
        signature: truncate_chars(&str_of(user, &["signature"]), MAX_TEXT_CHARS),
        followers: num_of(user, &["follower_count"]),
        following: num_of(user, &["following_count"]),
        likes: num_of(user, &["total_favorited"]),
        video_count: num_of(user, &["aweme_count"]),
    }
}

struct DouyinPager<'a> {
    client: &'a HubClient,
    sec_user_id: String,
}

#[async_trait]
impl PageSource for DouyinPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let max_cursor = match cursor {
            Some(Cursor::Offset(n)) => *n,
            _ => 0,
        };
        let data = self
            .client
            .get_data(
                "/api/v1/douyin/web/fetch_user_post_videos",
                &[
                    ("sec_user_id", self.sec_user_id.clone()),
                    ("max_cursor", max_cursor.to_string()),
                    ("count", PAGE_SIZE.to_string()),
                ],
            )
            .await
            .ok_or_else(|| anyhow!("user-post endpoint returned no data"))?;

        let items = super::list_of(&data, &["aweme_list"]);
        let has_more = bool_of(&data, &["has_more"]);
        // max_cursor is a millisecond watermark; 0 is a legitimate value
        // while has_more still says to continue.
        let next = ["max_cursor", "cursor"]
            .iter()
            .find_map(|k| data.get(*k))
            .map(super::coerce_u64)
            .map(Cursor::Offset);
        Ok(RawPage { items, next, has_more })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw)
    }
}

pub struct DouyinTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for DouyinTier {
    fn name(&self) -> &'static str {
        "douyin-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(GrabStatus::GettingProfile, "Fetching Douyin profile…")
            .await;

        let mut sec_user_id = sec_user_id_from(&ctx.url);
        if sec_user_id.is_none() {
            if let Some(resolved) = self.client.resolve_redirect(&ctx.url).await {
                sec_user_id = sec_user_id_from(&resolved);
            }
        }
        let Some(sec_user_id) = sec_user_id else {
            return TierOutcome::Failed("could not resolve Douyin user id".to_string());
        };

        let mut profile = ProfileInfo::fallback("Douyin User", &sec_user_id);
        if let Some(data) = self
            .client
            .get_data(
                "/api/v1/douyin/web/handler_user_profile",
                &[("sec_user_id", sec_user_id.clone())],
            )
            .await
        {
            profile = parse_profile(&data, &sec_user_id);
        }
        task.set_profile(profile).await;
        task.set_status(GrabStatus::Grabbing, "Fetching videos…").await;

        let pager = DouyinPager {
            client: &self.client,
            sec_user_id,
        };
        let appended = drive(&pager, task, ctx.max_items).await;
        if appended == 0 {
            TierOutcome::Empty
        } else {
            TierOutcome::Grabbed(appended)
        }
    }
}
