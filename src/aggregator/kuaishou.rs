// Kuaishou — aggregator Web API tier.
//
// Feeds paginate with the `pcursor` token. Durations come back in
// milliseconds and most count fields exist in both snake_case and
// camelCase depending on the endpoint generation.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::client::HubClient;
use super::{id_of, num_of, str_of, token_of};
use crate::grab::pager::{drive, Cursor, PageSource, RawPage};
use crate::grab::{GrabContext, GrabTier, TierOutcome};
use crate::item::{truncate_chars, ItemKind, ProfileInfo, UnifiedItem, MAX_TEXT_CHARS};
use crate::platform::Platform;
use crate::task::GrabStatus;

/// Convert one feed entry to the unified schema.
pub fn normalize_item(item: &Value) -> Option<UnifiedItem> {
    let id = id_of(item, &["photo_id", "id"]);
    if id.is_empty() {
        return None;
    }

    let caption = {
        let c = str_of(item, &["caption"]);
        if c.is_empty() {
            item.pointer("/ext_params/desc")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        } else {
            c
        }
    };
    let title = truncate_chars(&caption, MAX_TEXT_CHARS);

    let mut thumbnail = item
        .pointer("/cover_thumbnail_urls/0/url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if thumbnail.is_empty() {
        thumbnail = str_of(item, &["coverUrl", "headUrl"]);
    }

    Some(UnifiedItem {
        id: id.clone(),
        title: if title.is_empty() { "Video".to_string() } else { title },
        url: format!("https://www.kuaishou.com/short-video/{id}"),
        thumbnail,
        duration: num_of(item, &["duration"]) / 1000,
        view_count: num_of(item, &["view_count", "viewCount"]),
        like_count: num_of(item, &["like_count", "likeCount"]),
        comment_count: num_of(item, &["comment_count", "commentCount"]),
        share_count: num_of(item, &["share_count"]),
        create_time: num_of(item, &["timestamp"]) as i64,
        author: String::new(),
        platform: Platform::Kuaishou,
        kind: ItemKind::Video,
    })
}

fn parse_profile(data: &Value, user_id: &str) -> ProfileInfo {
    ProfileInfo {
        nickname: {
            let n = str_of(data, &["name", "user_name"]);
            if n.is_empty() { user_id.to_string() } else { n }
        },
        username: {
            let u = id_of(data, &["userId", "eid"]);
            if u.is_empty() { user_id.to_string() } else { u }
        },
        avatar: str_of(data, &["headurl", "hd_headurl"]),
        signature: truncate_chars(&str_of(data, &["description"]), MAX_TEXT_CHARS),
        followers: num_of(data, &["fan", "fansCount"]),
        following: num_of(data, &["follow", "followCount"]),
        likes: num_of(data, &["liked"]),
        video_count: num_of(data, &["photo_count", "photoCount"]),
    }
}

struct KuaishouPager<'a> {
    client: &'a HubClient,
    user_id: String,
}

#[async_trait]
impl PageSource for KuaishouPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let mut params = vec![("user_id", self.user_id.clone())];
        if let Some(Cursor::Token(t)) = cursor {
            params.push(("cursor", t.clone()));
        }
        let data = self
            .client
            .get_data("/api/v1/kuaishou/web/get_user_posts", &params)
            .await
            .ok_or_else(|| anyhow!("user-posts endpoint returned no data"))?;

        let items = super::list_of(&data, &["feeds", "photos", "list"]);
        let next = token_of(&data, &["cursor", "pcursor"]).map(Cursor::Token);
        Ok(RawPage {
            items,
            has_more: true,
            next,
        })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw)
    }
}

pub struct KuaishouTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for KuaishouTier {
    fn name(&self) -> &'static str {
        "kuaishou-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(GrabStatus::GettingProfile, "Fetching Kuaishou profile…")
            .await;

        let Some(user_id) = ctx.username.clone() else {
            return TierOutcome::Failed("no Kuaishou user id in URL".to_string());
        };

        let mut profile = ProfileInfo::fallback(&user_id, &user_id);
        if let Some(data) = self
            .client
            .get_data(
                "/api/v1/kuaishou/web/get_user_info",
                &[("user_id", user_id.clone())],
            )
            .await
        {
            profile = parse_profile(&data, &user_id);
        }
        task.set_profile(profile).await;
        task.set_status(GrabStatus::Grabbing, "Fetching videos…").await;

        let pager = KuaishouPager {
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
