// Reddit — aggregator API tier.
//
// No user-info endpoint worth calling — the profile is synthesized from
// the username and pagination uses Reddit's own `after` fullname token.
// Listing children wrap the post under a `data` key.

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

const PAGE_SIZE: u32 = 25;

/// Thumbnail placeholders Reddit uses instead of a real URL.
const THUMB_PLACEHOLDERS: &[&str] = &["self", "default", "nsfw", "spoiler"];

/// Convert one listing child to the unified schema. `username` is the
/// author fallback for shapes that omit it.
pub fn normalize_item(child: &Value, username: &str) -> Option<UnifiedItem> {
    let item = child.get("data").unwrap_or(child);

    let id = id_of(item, &["id", "name"]);
    if id.is_empty() {
        return None;
    }

    let title = truncate_chars(&str_of(item, &["title"]), MAX_TEXT_CHARS);
    let mut thumbnail = str_of(item, &["thumbnail"]);
    if THUMB_PLACEHOLDERS.contains(&thumbnail.as_str()) {
        thumbnail = String::new();
    }
    let permalink = str_of(item, &["permalink"]);
    let url = if permalink.is_empty() {
        String::new()
    } else {
        format!("https://www.reddit.com{permalink}")
    };
    let has_video =
        bool_of(item, &["is_video"]) || item.get("media").is_some_and(|m| !m.is_null());
    let author = {
        let a = str_of(item, &["author"]);
        if a.is_empty() { username.to_string() } else { a }
    };

    Some(UnifiedItem {
        id,
        title: if title.is_empty() { "Post".to_string() } else { title },
        url,
        thumbnail,
        duration: 0,
        view_count: num_of(item, &["view_count"]),
        like_count: num_of(item, &["ups", "score"]),
        comment_count: num_of(item, &["num_comments"]),
        share_count: num_of(item, &["num_crossposts"]),
        // created_utc is a float epoch.
        create_time: item
            .get("created_utc")
            .and_then(Value::as_f64)
            .unwrap_or(0.0) as i64,
        author,
        platform: Platform::Reddit,
        kind: if has_video { ItemKind::Video } else { ItemKind::Photo },
    })
}

struct RedditPager<'a> {
    client: &'a HubClient,
    username: String,
}

#[async_trait]
impl PageSource for RedditPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let mut params = vec![
            ("username", self.username.clone()),
            ("count", PAGE_SIZE.to_string()),
        ];
        if let Some(Cursor::Token(t)) = cursor {
            params.push(("after", t.clone()));
        }
        let data = self
            .client
            .get_data("/api/v1/reddit/web/get_user_posts", &params)
            .await
            .ok_or_else(|| anyhow!("user-posts endpoint returned no data"))?;

        let items = super::list_of(&data, &["children", "posts", "items"]);
        let next = token_of(&data, &["after"]).map(Cursor::Token);
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

pub struct RedditTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for RedditTier {
    fn name(&self) -> &'static str {
        "reddit-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;
        task.set_status(GrabStatus::GettingProfile, "Fetching Reddit profile…")
            .await;

        let Some(username) = ctx.username.clone() else {
            return TierOutcome::Failed("no Reddit username in URL".to_string());
        };

        task.set_profile(ProfileInfo::fallback(&username, &username))
            .await;
        task.set_status(GrabStatus::Grabbing, "Fetching posts…").await;

        let pager = RedditPager {
            client: &self.client,
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
