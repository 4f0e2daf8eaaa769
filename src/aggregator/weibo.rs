// Weibo — aggregator Web API tier.
//
// Posts paginate by page number with no has-more flag; the loop runs
// until an empty page, with a hard stop at page 50 as an infinite-scroll
// backstop. Post text arrives as HTML and is stripped to plain text.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use serde_json::Value;

use super::client::HubClient;
use super::{id_of, num_of, str_of};
use crate::grab::pager::{drive, Cursor, PageSource, RawPage};
use crate::grab::{GrabContext, GrabTier, TierOutcome};
use crate::item::{truncate_chars, ItemKind, ProfileInfo, UnifiedItem, MAX_TEXT_CHARS};
use crate::platform::Platform;
use crate::task::GrabStatus;

const MAX_PAGES: u32 = 50;

/// Drop HTML tags and decode the handful of entities Weibo actually emits.
fn strip_html(text: &str) -> String {
    let without_tags = match Regex::new(r"<[^>]+>") {
        Ok(re) => re.replace_all(text, "").into_owned(),
        Err(_) => text.to_string(),
    };
    without_tags
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Convert one status to the unified schema.
pub fn normalize_item(item: &Value) -> Option<UnifiedItem> {
    let id = id_of(item, &["mid", "id", "idstr"]);
    if id.is_empty() {
        return None;
    }

    let text = strip_html(&str_of(item, &["text_raw", "text"]));
    let title = truncate_chars(&text, MAX_TEXT_CHARS);

    let page_info = item.get("page_info").unwrap_or(&Value::Null);
    let mut thumbnail = page_info
        .pointer("/page_pic/url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if thumbnail.is_empty() {
        if let Some(first_pic) = item.get("pics").and_then(Value::as_array).and_then(|p| p.first())
        {
            thumbnail = first_pic
                .pointer("/large/url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| str_of(first_pic, &["url"]));
        }
    }
    let has_video = str_of(page_info, &["type"]) == "video";

    let user = item.get("user").unwrap_or(&Value::Null);
    let owner_id = id_of(user, &["id"]);
    let url = if owner_id.is_empty() {
        String::new()
    } else {
        format!("https://weibo.com/{owner_id}/{id}")
    };

    Some(UnifiedItem {
        id,
        title: if title.is_empty() { "Post".to_string() } else { title },
        url,
        thumbnail,
        duration: 0,
        view_count: num_of(item, &["reads_count", "show_count"]),
        like_count: num_of(item, &["attitudes_count"]),
        comment_count: num_of(item, &["comments_count"]),
        share_count: num_of(item, &["reposts_count"]),
        create_time: 0,
        author: str_of(user, &["screen_name"]),
        platform: Platform::Weibo,
        kind: if has_video { ItemKind::Video } else { ItemKind::Photo },
    })
}

fn parse_profile(data: &Value, uid: &str) -> ProfileInfo {
    ProfileInfo {
        nickname: {
            let n = str_of(data, &["screen_name"]);
            if n.is_empty() { uid.to_string() } else { n }
        },
        username: {
            let u = str_of(data, &["domain"]);
            if u.is_empty() {
                let id = id_of(data, &["id"]);
                if id.is_empty() { uid.to_string() } else { id }
            } else {
                u
            }
        },
        avatar: str_of(data, &["avatar_hd", "profile_image_url"]),
        signature: truncate_chars(&str_of(data, &["description"]), MAX_TEXT_CHARS),
        followers: num_of(data, &["followers_count"]),
        following: num_of(data, &["friends_count"]),
        likes: 0,
        video_count: num_of(data, &["statuses_count"]),
    }
}

struct WeiboPager<'a> {
    client: &'a HubClient,
    uid: String,
}

#[async_trait]
impl PageSource for WeiboPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let page = match cursor {
            Some(Cursor::Page(p)) => *p,
            _ => 1,
        };
        let data = self
            .client
            .get_data(
                "/api/v1/weibo/web/get_user_posts",
                &[("uid", self.uid.clone()), ("page", page.to_string())],
            )
            .await
            .ok_or_else(|| anyhow!("user-posts endpoint returned no data"))?;

        let items = super::list_of(&data, &["statuses", "list", "cards"]);
        let next = if page < MAX_PAGES {
            Some(Cursor::Page(page + 1))
        } else {
            None
        };
        Ok(RawPage {
            items,
            next,
            has_more: true,
        })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw)
    }
}

pub struct WeiboTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for WeiboTier {
    fn name(&self) -> &'static str {
        "weibo-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(GrabStatus::GettingProfile, "Fetching Weibo profile…")
            .await;

        let Some(uid) = ctx.username.clone() else {
            return TierOutcome::Failed("no Weibo uid in URL".to_string());
        };

        let mut profile = ProfileInfo::fallback(&uid, &uid);
        if let Some(data) = self
            .client
            .get_data("/api/v1/weibo/web/get_user_info", &[("uid", uid.clone())])
            .await
        {
            profile = parse_profile(&data, &uid);
        }
        task.set_profile(profile).await;
        task.set_status(GrabStatus::Grabbing, "Fetching posts…").await;

        let pager = WeiboPager {
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
