// Xiaohongshu — aggregator Web API tier.
//
// Identity is the user id straight from the profile URL; notes paginate
// with an opaque string cursor.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::client::HubClient;
use super::{bool_of, id_of, num_of, str_of, token_of};
use crate::grab::pager::{drive, Cursor, PageSource, RawPage};
use crate::grab::{GrabContext, GrabTier, TierOutcome};
use crate::item::{truncate_chars, ItemKind, ProfileInfo, UnifiedItem, MAX_TEXT_CHARS};
use crate::platform::Platform;
use crate::task::GrabStatus;

/// Convert one note to the unified schema.
pub fn normalize_item(item: &Value) -> Option<UnifiedItem> {
    let id = id_of(item, &["note_id", "id"]);
    if id.is_empty() {
        return None;
    }

    // Covers are an object on note lists, an image array on search shapes.
    let thumbnail = match item.get("cover") {
        Some(cover @ Value::Object(_)) => str_of(cover, &["url", "url_default"]),
        Some(Value::Array(covers)) => covers
            .first()
            .map(|c| str_of(c, &["url", "url_default"]))
            .unwrap_or_default(),
        _ => item
            .get("image_list")
            .and_then(Value::as_array)
            .and_then(|l| l.first())
            .map(|c| str_of(c, &["url", "url_default"]))
            .unwrap_or_default(),
    };

    let interact = item.get("interact_info").unwrap_or(&Value::Null);
    let like_count = {
        let n = num_of(interact, &["liked_count"]);
        if n == 0 { num_of(item, &["liked_count"]) } else { n }
    };
    let is_video = str_of(item, &["type"]) == "video" || str_of(item, &["media_type"]) == "video";

    let title = truncate_chars(
        &str_of(item, &["display_title", "title", "desc"]),
        MAX_TEXT_CHARS,
    );
    Some(UnifiedItem {
        id: id.clone(),
        title: if title.is_empty() { "Post".to_string() } else { title },
        url: format!("https://www.xiaohongshu.com/explore/{id}"),
        thumbnail,
        duration: 0,
        view_count: num_of(interact, &["view_count"]),
        like_count,
        comment_count: num_of(interact, &["comment_count"]),
        share_count: num_of(interact, &["share_count"]),
        create_time: num_of(item, &["time", "create_time"]) as i64,
        author: item
            .get("user")
            .map(|u| str_of(u, &["nickname"]))
            .unwrap_or_default(),
        platform: Platform::Xiaohongshu,
        kind: if is_video { ItemKind::Video } else { ItemKind::Photo },
    })
}

fn parse_profile(data: &Value, user_id: &str) -> ProfileInfo {
    ProfileInfo {
        nickname: {
            let n = str_of(data, &["nickname"]);
            if n.is_empty() { user_id.to_string() } else { n }
        },
        username: {
            let u = str_of(data, &["red_id"]);
            if u.is_empty() { user_id.to_string() } else { u }
        },
        avatar: str_of(data, &["imageb", "images"]),
        signature: truncate_chars(&str_of(data, &["desc"]), MAX_TEXT_CHARS),
        followers: num_of(data, &["fans", "fansCount"]),
        following: num_of(data, &["follows", "followingCount"]),
        likes: num_of(data, &["liked", "interaction"]),
        video_count: num_of(data, &["noteCount", "notes"]),
    }
}

struct XiaohongshuPager<'a> {
    client: &'a HubClient,
    user_id: String,
}

#[async_trait]
impl PageSource for XiaohongshuPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let mut params = vec![("user_id", self.user_id.clone())];
        if let Some(Cursor::Token(t)) = cursor {
            params.push(("cursor", t.clone()));
        }
        let data = self
            .client
            .get_data("/api/v1/xiaohongshu/web/get_user_posts", &params)
            .await
            .ok_or_else(|| anyhow!("user-posts endpoint returned no data"))?;

        let items = super::list_of(&data, &["notes", "items"]);
        let has_more = bool_of(&data, &["has_more"]);
        let next = token_of(&data, &["cursor", "next_cursor"]).map(Cursor::Token);
        Ok(RawPage { items, next, has_more })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw)
    }
}

pub struct XiaohongshuTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for XiaohongshuTier {
    fn name(&self) -> &'static str {
        "xiaohongshu-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(GrabStatus::GettingProfile, "Fetching Xiaohongshu profile…")
            .await;

        let Some(user_id) = ctx.username.clone() else {
            return TierOutcome::Failed("no Xiaohongshu user id in URL".to_string());
        };

        let mut profile = ProfileInfo::fallback(&user_id, &user_id);
        if let Some(data) = self
            .client
            .get_data(
                "/api/v1/xiaohongshu/web/get_user_info",
                &[("user_id", user_id.clone())],
            )
            .await
        {
            profile = parse_profile(&data, &user_id);
        }
        task.set_profile(profile).await;
        task.set_status(GrabStatus::Grabbing, "Fetching posts…").await;

        let pager = XiaohongshuPager {
            client: &self.client,
            user_id,
        };
        let appended = drive(&pager, task, ctx.max_items).await;
        if appended == 0 {
            TierOutcome::Empty
        } else {
            TierOutcome::Grabbed(appended)
        }
    }
}
