// Instagram — aggregator App + Web API tier.
//
// The App API is the reliable identity source, so it is tried first; the
// Web API is the in-tier fallback with its GraphQL-style edge/node
// envelopes. Whichever resolved the user id also picks the posts
// endpoint, and a reels pass tops the timeline up afterwards (reels don't
// always appear in the timeline feed).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

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

/// Path segments that the username pattern matches but that are not
/// profiles (post permalinks, the explore page, account settings).
const NON_PROFILE_SEGMENTS: &[&str] =
    &["p", "reel", "reels", "stories", "explore", "accounts", "direct"];

/// Convert one Instagram media item (Web or App shape) to the unified
/// schema.
pub fn normalize_item(item: &Value) -> Option<UnifiedItem> {
    let shortcode = str_of(item, &["shortcode", "code"]);
    let pk = id_of(item, &["pk", "id"]);
    let id = if pk.is_empty() { shortcode.clone() } else { pk.clone() };
    if id.is_empty() {
        return None;
    }

    // Captions are objects on App responses, bare strings on Web ones.
    let title = match item.get("caption") {
        Some(caption @ Value::Object(_)) => str_of(caption, &["text"]),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let title = truncate_chars(&title, MAX_TEXT_CHARS);

    let mut thumbnail = item
        .pointer("/image_versions2/candidates/0/url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if thumbnail.is_empty() {
        thumbnail = str_of(item, &["display_url", "thumbnail_src"]);
    }
    if thumbnail.is_empty() {
        thumbnail = item
            .get("thumbnail_resources")
            .and_then(Value::as_array)
            .and_then(|r| r.last())
            .map(|t| str_of(t, &["src"]))
            .unwrap_or_default();
    }

    let mut like_count = num_of(item, &["like_count"]);
    if like_count == 0 {
        like_count = item
            .pointer("/edge_media_preview_like/count")
            .map(super::coerce_u64)
            .unwrap_or(0);
    }
    let mut comment_count = num_of(item, &["comment_count"]);
    if comment_count == 0 {
        comment_count = ["edge_media_to_comment", "edge_media_preview_comment"]
            .iter()
            .find_map(|k| item.get(*k))
            .and_then(|e| e.get("count"))
            .map(super::coerce_u64)
            .unwrap_or(0);
    }
    let mut view_count = num_of(item, &["view_count", "video_view_count"]);
    if view_count == 0 {
        view_count = num_of(item, &["play_count"]);
    }

    let media_type = item.get("media_type").and_then(Value::as_i64).unwrap_or(0);
    let product_type = str_of(item, &["product_type"]);
    let is_video = bool_of(item, &["is_video"])
        || media_type == 2
        || matches!(product_type.as_str(), "video" | "clips" | "igtv");
    let kind = if product_type == "clips" {
        ItemKind::Reel
    } else if is_video {
        ItemKind::Video
    } else {
        ItemKind::Photo
    };

    let owner = ["owner", "user"]
        .iter()
        .find_map(|k| item.get(*k))
        .unwrap_or(&Value::Null);
    let author = str_of(owner, &["full_name", "username"]);

    let url = if !shortcode.is_empty() {
        format!("https://www.instagram.com/p/{shortcode}/")
    } else {
        format!("https://www.instagram.com/p/{pk}/")
    };

    Some(UnifiedItem {
        id,
        title: if title.is_empty() { "Post".to_string() } else { title },
        url,
        thumbnail,
        duration: num_of(item, &["video_duration"]),
        view_count,
        like_count,
        comment_count,
        share_count: 0,
        create_time: num_of(item, &["taken_at", "taken_at_timestamp"]) as i64,
        author,
        platform: Platform::Instagram,
        kind,
    })
}

/// Which API generation resolved the account — it decides the posts
/// endpoint and pagination scheme.
#[derive(Clone, Copy, PartialEq)]
enum ApiGeneration {
    App,
    Web,
}

fn parse_app_profile(data: &Value, username: &str) -> (String, ProfileInfo) {
    let user = data.get("user").unwrap_or(data);
    let user_id = id_of(user, &["pk", "pk_id", "id"]);
    let mut avatar = user
        .pointer("/hd_profile_pic_url_info/url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if avatar.is_empty() {
        avatar = str_of(user, &["profile_pic_url"]);
    }
    let profile = ProfileInfo {
        nickname: {
            let n = str_of(user, &["full_name"]);
            if n.is_empty() { username.to_string() } else { n }
        },
        username: {
            let u = str_of(user, &["username"]);
            if u.is_empty() { username.to_string() } else { u }
        },
        avatar,
        signature: truncate_chars(&str_of(user, &["biography"]), MAX_TEXT_CHARS),
        followers: num_of(user, &["follower_count"]),
        following: num_of(user, &["following_count"]),
        likes: 0,
        video_count: num_of(user, &["media_count"]),
    };
    (user_id, profile)
}

fn parse_web_profile(data: &Value, username: &str) -> (String, ProfileInfo) {
    let user = data.get("user").unwrap_or(data);
    let user_id = id_of(user, &["id", "pk"]);
    let edge_count = |key: &str| {
        user.get(key)
            .and_then(|e| e.get("count"))
            .map(super::coerce_u64)
            .unwrap_or(0)
    };
    let followers = {
        let n = edge_count("edge_followed_by");
        if n == 0 { num_of(user, &["follower_count"]) } else { n }
    };
    let following = {
        let n = edge_count("edge_follow");
        if n == 0 { num_of(user, &["following_count"]) } else { n }
    };
    let video_count = {
        let n = edge_count("edge_owner_to_timeline_media");
        if n == 0 { num_of(user, &["media_count"]) } else { n }
    };
    let profile = ProfileInfo {
        nickname: {
            let n = str_of(user, &["full_name"]);
            if n.is_empty() { username.to_string() } else { n }
        },
        username: {
            let u = str_of(user, &["username"]);
            if u.is_empty() { username.to_string() } else { u }
        },
        avatar: str_of(user, &["profile_pic_url_hd", "profile_pic_url"]),
        signature: truncate_chars(&str_of(user, &["biography"]), MAX_TEXT_CHARS),
        followers,
        following,
        likes: 0,
        video_count,
    };
    (user_id, profile)
}

/// Timeline posts, App API shape: flat `items` with a `max_id` token.
struct AppPostsPager<'a> {
    client: &'a HubClient,
    user_id: String,
}

#[async_trait]
impl PageSource for AppPostsPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let mut params = vec![
            ("user_id", self.user_id.clone()),
            ("count", "33".to_string()),
        ];
        if let Some(Cursor::Token(t)) = cursor {
            params.push(("max_id", t.clone()));
        }
        let data = self
            .client
            .get_data("/api/v1/instagram/app/get_user_posts", &params)
            .await
            .ok_or_else(|| anyhow!("app posts endpoint returned no data"))?;

        // App items sometimes nest the media one level down.
        let items: Vec<Value> = super::list_of(&data, &["items", "feed_items"])
            .into_iter()
            .map(|item| item.get("media").cloned().unwrap_or(item))
            .collect();
        let has_more = bool_of(&data, &["more_available"]);
        let next = token_of(&data, &["next_max_id"]).map(Cursor::Token);
        Ok(RawPage { items, next, has_more })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw)
    }
}

/// Timeline posts, Web API shape: GraphQL edges with `page_info`.
struct WebPostsPager<'a> {
    client: &'a HubClient,
    user_id: String,
}

#[async_trait]
impl PageSource for WebPostsPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let mut params = vec![
            ("user_id", self.user_id.clone()),
            ("count", "12".to_string()),
        ];
        if let Some(Cursor::Token(t)) = cursor {
            params.push(("end_cursor", t.clone()));
        }
        let data = self
            .client
            .get_data("/api/v1/instagram/web/get_user_posts", &params)
            .await
            .ok_or_else(|| anyhow!("web posts endpoint returned no data"))?;

        let media = data
            .get("edge_owner_to_timeline_media")
            .or_else(|| data.pointer("/user/edge_owner_to_timeline_media"))
            .unwrap_or(&data);

        if let Some(edges) = media.get("edges").and_then(Value::as_array) {
            let items: Vec<Value> = edges
                .iter()
                .map(|edge| edge.get("node").cloned().unwrap_or_else(|| edge.clone()))
                .collect();
            let page_info = media.get("page_info").unwrap_or(&Value::Null);
            let has_more = bool_of(page_info, &["has_next_page"]);
            let next = token_of(page_info, &["end_cursor"]).map(Cursor::Token);
            return Ok(RawPage { items, next, has_more });
        }

        // Some deployments answer the Web endpoint with an App-style flat
        // items list; take it as a single page.
        let items = super::list_of(&data, &["items"]);
        Ok(RawPage {
            items,
            next: None,
            has_more: false,
        })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        normalize_item(raw)
    }
}

/// Reels supplement: same item shape, `paging_info` envelope, forced
/// `reel` kind, deduplicated against everything already collected.
struct ReelsPager<'a> {
    client: &'a HubClient,
    user_id: String,
    seen: Mutex<HashSet<String>>,
}

#[async_trait]
impl PageSource for ReelsPager<'_> {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RawPage> {
        let mut params = vec![
            ("user_id", self.user_id.clone()),
            ("count", "12".to_string()),
        ];
        if let Some(Cursor::Token(t)) = cursor {
            params.push(("max_id", t.clone()));
        }
        let data = self
            .client
            .get_data("/api/v1/instagram/app/get_user_reels", &params)
            .await
            .ok_or_else(|| anyhow!("reels endpoint returned no data"))?;

        let items: Vec<Value> = super::list_of(&data, &["items"])
            .into_iter()
            .map(|item| item.get("media").cloned().unwrap_or(item))
            .collect();
        let paging = data.get("paging_info").unwrap_or(&Value::Null);
        let has_more = bool_of(paging, &["more_available"]);
        let next = token_of(paging, &["max_id"])
            .or_else(|| token_of(&data, &["next_max_id"]))
            .map(Cursor::Token);
        Ok(RawPage { items, next, has_more })
    }

    fn normalize(&self, raw: &Value) -> Option<UnifiedItem> {
        let mut item = normalize_item(raw)?;
        if !self.seen.lock().expect("seen set poisoned").insert(item.id.clone()) {
            return None;
        }
        item.kind = ItemKind::Reel;
        Some(item)
    }
}

pub struct InstagramTier {
    pub client: Arc<HubClient>,
}

#[async_trait]
impl GrabTier for InstagramTier {
    fn name(&self) -> &'static str {
        "instagram-api"
    }

    async fn run(&self, ctx: &GrabContext) -> TierOutcome {
        let task = &ctx.task;

        let Some(raw_username) = ctx.username.clone() else {
            return TierOutcome::Failed("no Instagram username in URL".to_string());
        };
        // The username pattern is loose enough to match /p/<shortcode> and
        // friends; those are posts, not profiles.
        let username = raw_username
            .trim_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if username.is_empty() || NON_PROFILE_SEGMENTS.contains(&username.to_lowercase().as_str())
        {
            return TierOutcome::Failed(format!("'{username}' is not a profile"));
        }

        // App API first — it resolves accounts the Web API hides.
        task.set_status(GrabStatus::GettingProfile, "Using Instagram App API…")
            .await;
        let mut generation = ApiGeneration::App;
        let mut resolved = match self
            .client
            .get_data(
                "/api/v1/instagram/app/get_user_info",
                &[("username", username.clone())],
            )
            .await
        {
            Some(data) => {
                let (id, profile) = parse_app_profile(&data, &username);
                if id.is_empty() { None } else { Some((id, profile)) }
            }
            None => None,
        };

        if resolved.is_none() {
            task.set_message("Using Instagram Web API…").await;
            generation = ApiGeneration::Web;
            resolved = match self
                .client
                .get_data(
                    "/api/v1/instagram/web/get_user_info",
                    &[("username", username.clone())],
                )
                .await
            {
                Some(data) => {
                    let (id, profile) = parse_web_profile(&data, &username);
                    if id.is_empty() { None } else { Some((id, profile)) }
                }
                None => None,
            };
        }

        let Some((user_id, profile)) = resolved else {
            return TierOutcome::Failed(format!("could not resolve @{username}"));
        };

        task.set_profile(profile).await;
        task.set_status(GrabStatus::Grabbing, "Fetching posts…").await;

        let mut appended = match generation {
            ApiGeneration::App => {
                let pager = AppPostsPager {
                    client: &self.client,
                    user_id: user_id.clone(),
                };
                drive(&pager, task, ctx.max_items).await
            }
            ApiGeneration::Web => {
                let pager = WebPostsPager {
                    client: &self.client,
                    user_id: user_id.clone(),
                };
                drive(&pager, task, ctx.max_items).await
            }
        };

        // Reels pass unless the cap is already spent.
        let total = task.total().await;
        if total < 5 || ctx.max_items == 0 || total < ctx.max_items {
            task.set_message(&format!("Fetching reels… ({total} items)")).await;
            let pager = ReelsPager {
                client: &self.client,
                user_id,
                seen: Mutex::new(task.item_ids().await),
            };
            appended += drive(&pager, task, ctx.max_items).await;
        }

        if appended == 0 {
            TierOutcome::Empty
        } else {
            TierOutcome::Grabbed(appended)
        }
    }
}
