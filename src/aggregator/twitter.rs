// X/Twitter — aggregator Web API tier.
//
// The handle comes from the URL; the user-info endpoint maps it to the
// numeric user id that the tweets endpoint requires. Without that id the
// tier fails over to generic extraction.

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

const PAGE_SIZE: u32 = 20;

/// Convert one tweet to the unified schema.
pub fn normalize_item(item: &Value) -> Option<UnifiedItem> {
    let id = id_of(item, &["id", "id_str"]);
    if id.is_empty() {
        return None;
    }

    let text = str_of(item, &["full_text", "text"]);
    let title = truncate_chars(&text, MAX_TEXT_CHARS);

    let media = item
        .pointer("/extended_entities/media")
        .or_else(|| item.pointer("/entities/media"))
        .and_then(Value::as_array)
        .and_then(|m| m.first());
    let thumbnail = media
        .map(|m| str_of(m, &["media_url_https", "media_url"]))
        .unwrap_or_default();
    let has_video = media
        .map(|m| str_of(m, &["type"]) == "video")
        .unwrap_or(false);

    let user = item.get("user").unwrap_or(&Value::Null);
    let screen_name = str_of(user, &["screen_name"]);
    let url = if screen_name.is_empty() {
        String::new()
    } else {
        format!("https://x.com/{screen_name}/status/{id}")
    };
    let author = {
        let n = str_of(user, &["name"]);
        if n.is_empty() { screen_name } else { n }
    };

    Some(UnifiedItem {
        id,
        title: if title.is_empty() { "Tweet".to_string() } else { title },
        url,
        thumbnail,
        duration: 0,
        view_count: num_of(item, &["view_count"]),
        like_count: num_of(item, &["favorite_count"]),
        comment_count: num_of(item, &["reply_count"]),
        share_count: num_of(item, &["retweet_count"]),
        create_time: 0,
        author,
        platform: Platform::Twitter,
        kind: if has_video { ItemKind::Video } else { ItemKind::Photo },
    })
}

fn parse_profile(data: &Value, screen_name: &str) -> (String, ProfileInfo) {
    let user_id = id_of(data, &["id", "id_str"]);
    let avatar = str_of(data, &["profile_image_url_https"]).replace("_normal", "");
    let profile = ProfileInfo {
        nickname: {
            let n = str_of(data, &["name"]);
            if n.is_empty() { screen_name.to_string() } else { n }
        },
        username: {
            let u = str_of(data, &["screen_name"]);
            if u.is_empty() { screen_name.to_string() } else { u }
        },
        avatar,
        signature: truncate_chars(&str_of(data, &["description"]), MAX_TEXT_CHARS),
        followers: num_of(data, &["followers_count"]),
        following: num_of(data, &["friends_count"]),
        likes: num_of(data, &["favourites_count"]),
        video_count: num_of(data, &["statuses_count"]),
    };
    (user_id, profile)
}

struct TwitterPager<'a> {
    client: &'a HubClient,
    user_id: String,
}

#[async_trait]
impl PageSource for TwitterPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let mut params = vec![
            ("user_id", self.user_id.clone()),
            ("count", PAGE_SIZE.to_string()),
        ];
        if let Some(Cursor::Token(t)) = cursor {
            params.push(("cursor", t.clone()));
        }
        let data = self
            .client
            .get_data("/api/v1/twitter/web/get_user_tweets", &params)
            .await
            .ok_or_else(|| anyhow!("user-tweets endpoint returned no data"))?;

        let items = super::list_of(&data, &["tweets", "list"]);
        let next = token_of(&data, &["cursor", "next_cursor"]).map(Cursor::Token);
        Ok(RawPage {
            items,
            // No has-more flag on this endpoint; the cursor drying up is
            // the only end signal.
            has_more: true,
            next,
        })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw)
    }
}

pub struct TwitterTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for TwitterTier {
    fn name(&self) -> &'static str {
        "twitter-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(GrabStatus::GettingProfile, "Fetching X/Twitter profile…")
            .await;

        let Some(screen_name) = ctx.username.clone() else {
            return TierOutcome::Failed("no Twitter handle in URL".to_string());
        };

        let mut user_id = String::new();
        let mut profile = ProfileInfo::fallback(&screen_name, &screen_name);
        if let Some(data) = self
            .client
            .get_data(
                "/api/v1/twitter/web/get_user_info",
                &[("screen_name", screen_name.clone())],
            )
            .await
        {
            let (id, info) = parse_profile(&data, &screen_name);
            user_id = id;
            profile = info;
        }
        task.set_profile(profile).await;

        if user_id.is_empty() {
            return TierOutcome::Failed(format!("could not resolve @{screen_name}"));
        }
        task.set_status(GrabStatus::Grabbing, "Fetching tweets…").await;

        let pager = TwitterPager {
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
