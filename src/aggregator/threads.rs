// Threads — aggregator API tier.
//
// Thread posts arrive wrapped: a page entry may be a container whose
// `thread_items` array holds the actual post, which itself may nest under
// a `post` key. The normalizer unwraps both layers before reading fields.

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

/// Convert one thread entry to the unified schema. `username` fills the
/// author and the canonical post URL — the post body doesn't repeat it.
pub fn normalize_item(item: &Value, username: &str) -> Option<UnifiedItem> {
    let unwrapped = item
        .get("thread_items")
        .and_then(Value::as_array)
        .and_then(|t| t.first())
        .unwrap_or(item);
    let post = unwrapped.get("post").unwrap_or(unwrapped);

    let id = id_of(post, &["pk", "id"]);
    if id.is_empty() {
        return None;
    }

    let text = match post.get("caption") {
        Some(caption @ Value::Object(_)) => str_of(caption, &["text"]),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let title = truncate_chars(&text, MAX_TEXT_CHARS);

    let code = str_of(post, &["code"]);
    let url = if code.is_empty() {
        String::new()
    } else {
        format!("https://www.threads.net/@{username}/post/{code}")
    };
    let thumbnail = post
        .pointer("/image_versions2/candidates/0/url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let comment_count = post
        .pointer("/text_post_app_info/reply_count")
        .map(super::coerce_u64)
        .unwrap_or(0);
    let has_video = post.get("video_versions").is_some_and(|v| !v.is_null());

    Some(UnifiedItem {
        id,
        title: if title.is_empty() { "Post".to_string() } else { title },
        url,
        thumbnail,
        duration: 0,
        view_count: 0,
        like_count: num_of(post, &["like_count"]),
        comment_count,
        share_count: num_of(post, &["reshare_count"]),
        create_time: num_of(post, &["taken_at"]) as i64,
        author: username.to_string(),
        platform: Platform::Threads,
        kind: if has_video { ItemKind::Video } else { ItemKind::Photo },
    })
}

fn parse_profile(data: &Value, username: &str) -> (String, ProfileInfo) {
    let user_id = id_of(data, &["pk", "id"]);
    let profile = ProfileInfo {
        nickname: {
            let n = str_of(data, &["full_name"]);
            if n.is_empty() { username.to_string() } else { n }
        },
        username: {
            let u = str_of(data, &["username"]);
            if u.is_empty() { username.to_string() } else { u }
        },
        avatar: str_of(data, &["profile_pic_url"]),
        signature: truncate_chars(&str_of(data, &["biography"]), MAX_TEXT_CHARS),
        followers: num_of(data, &["follower_count"]),
        following: num_of(data, &["following_count"]),
        likes: 0,
        video_count: num_of(data, &["media_count"]),
    };
    (user_id, profile)
}

struct ThreadsPager<'a> {
    client: &'a HubClient,
    user_id: String,
    username: String,
}

#[async_trait]
impl PageSource for ThreadsPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let mut params = vec![("user_id", self.user_id.clone())];
        if let Some(Cursor::Token(t)) = cursor {
            params.push(("max_id", t.clone()));
        }
        let data = self
            .client
            .get_data("/api/v1/threads/web/get_user_posts", &params)
            .await
            .ok_or_else(|| anyhow!("user-posts endpoint returned no data"))?;

        let items = super::list_of(&data, &["threads", "items", "posts"]);
        let next = token_of(&data, &["next_max_id", "cursor"]).map(Cursor::Token);
        Ok(RawPage {
            items,
            has_more: true,
            next,
        })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw, &self.username)
    }
}

pub struct ThreadsTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for ThreadsTier {
    fn name(&self) -> &'static str {
        "threads-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(GrabStatus::GettingProfile, "Fetching Threads profile…")
            .await;

        let Some(username) = ctx.username.clone() else {
            return TierOutcome::Failed("no Threads username in URL".to_string());
        };

        let mut user_id = String::new();
        let mut profile = ProfileInfo::fallback(&username, &username);
        if let Some(data) = self
            .client
            .get_data(
                "/api/v1/threads/web/get_user_info",
                &[("username", username.clone())],
            )
            .await
        {
            let (id, info) = parse_profile(&data, &username);
            user_id = id;
            profile = info;
        }
        task.set_profile(profile).await;

        if user_id.is_empty() {
            return TierOutcome::Failed(format!("could not resolve @{username}"));
        }
        task.set_status(GrabStatus::Grabbing, "Fetching posts…").await;

        let pager = ThreadsPager {
            client: &self.client,
            user_id,
            username,
        };
        let appended = drive(&pager, task, ctx.max_items).await;
        if appended == 0 {
            TierOutcome::Empty
        } else {
            TierOutcome::Grabbed(appended)
        }
    }
}
