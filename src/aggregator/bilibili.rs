// Bilibili — aggregator Web API tier.
//
// Identity is the numeric space uid from the URL. Videos paginate by page
// number against a server-reported page count rather than a cursor.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::client::HubClient;
use super::{id_of, num_of, str_of};
use crate::grab::pager::{drive, Cursor, PageSource, RawPage};
use crate::grab::{GrabContext, GrabTier, TierOutcome};
use crate::item::{truncate_chars, ItemKind, ProfileInfo, UnifiedItem, MAX_TEXT_CHARS};
use crate::platform::Platform;
use crate::task::GrabStatus;

const PAGE_SIZE: u32 = 30;

/// Convert one video entry to the unified schema.
pub fn normalize_item(item: &Value) -> Option<UnifiedItem> {
    let bvid = str_of(item, &["bvid"]);
    let id = if bvid.is_empty() {
        id_of(item, &["aid", "id"])
    } else {
        bvid.clone()
    };
    if id.is_empty() {
        return None;
    }

    let stat = item.get("stat").unwrap_or(&Value::Null);
    let view_count = {
        let n = num_of(item, &["play"]);
        if n == 0 { num_of(stat, &["view"]) } else { n }
    };
    let comment_count = {
        let n = num_of(stat, &["reply"]);
        if n == 0 { num_of(item, &["comment"]) } else { n }
    };
    let author = {
        let a = str_of(item, &["author"]);
        if a.is_empty() {
            item.pointer("/owner/name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        } else {
            a
        }
    };

    let title = truncate_chars(&str_of(item, &["title"]), MAX_TEXT_CHARS);
    Some(UnifiedItem {
        id,
        title: if title.is_empty() { "Video".to_string() } else { title },
        url: if bvid.is_empty() {
            String::new()
        } else {
            format!("https://www.bilibili.com/video/{bvid}")
        },
        thumbnail: str_of(item, &["pic", "cover"]),
        duration: num_of(item, &["duration", "length"]),
        view_count,
        like_count: num_of(stat, &["like"]),
        comment_count,
        share_count: num_of(stat, &["share"]),
        create_time: num_of(item, &["created", "pubdate"]) as i64,
        author,
        platform: Platform::Bilibili,
        kind: ItemKind::Video,
    })
}

fn parse_profile(data: &Value, uid: &str) -> ProfileInfo {
    ProfileInfo {
        nickname: {
            let n = str_of(data, &["name"]);
            if n.is_empty() { uid.to_string() } else { n }
        },
        username: {
            let u = id_of(data, &["mid"]);
            if u.is_empty() { uid.to_string() } else { u }
        },
        avatar: str_of(data, &["face"]),
        signature: truncate_chars(&str_of(data, &["sign"]), MAX_TEXT_CHARS),
        followers: num_of(data, &["fans", "follower"]),
        following: num_of(data, &["following", "friend"]),
        likes: num_of(data, &["likes"]),
        video_count: num_of(data, &["archive_count", "video"]),
    }
}

struct BilibiliPager<'a> {
    client: &'a HubClient,
    uid: String,
}

#[async_trait]
impl PageSource for BilibiliPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let page = match cursor {
            Some(Cursor::Page(p)) => *p,
            _ => 1,
        };
        let data = self
            .client
            .get_data(
                "/api/v1/bilibili/web/get_user_videos",
                &[
                    ("uid", self.uid.clone()),
                    ("page", page.to_string()),
                    ("page_size", PAGE_SIZE.to_string()),
                ],
            )
            .await
            .ok_or_else(|| anyhow!("user-videos endpoint returned no data"))?;

        let items = super::list_of(&data, &["vlist", "list", "items"]);
        let total_pages = {
            let n = num_of(&data, &["pages"]);
            if n == 0 {
                data.pointer("/page/pn").map(super::coerce_u64).unwrap_or(1)
            } else {
                n
            }
        };
        let has_more = u64::from(page) < total_pages;
        let next = if has_more { Some(Cursor::Page(page + 1)) } else { None };
        Ok(RawPage { items, next, has_more })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw)
    }
}

pub struct BilibiliTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for BilibiliTier {
    fn name(&self) -> &'static str {
        "bilibili-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(GrabStatus::GettingProfile, "Fetching Bilibili profile…")
            .await;

        let Some(uid) = ctx.username.clone() else {
            return TierOutcome::Failed("no Bilibili space id in URL".to_string());
        };

        let mut profile = ProfileInfo::fallback(&uid, &uid);
        if let Some(data) = self
            .client
            .get_data("/api/v1/bilibili/web/get_user_info", &[("uid", uid.clone())])
            .await
        {
            profile = parse_profile(&data, &uid);
        }
        task.set_profile(profile).await;
        task.set_status(GrabStatus::Grabbing, "Fetching videos…").await;

        let pager = BilibiliPager {
            client: &self.client,
            uid,
        };
        let appended = drive(&pager, task, ctx.max_items).await;
        if appended == 0 {
            TierOutcome::Empty
        } else {
            TierOutcome::Grabbed(appended)
        }
    }
}
