// Platform resolution — URL to platform identifier and account handle.
//
// Detection is a first-match-wins walk over an ordered table of domain
// fragments; the fragments are platform-exclusive domains, so order only
// matters for readability. Everything in this module is pure and total:
// unrecognized input yields None, never a panic.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// One supported content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    TikTok,
    Douyin,
    YouTube,
    Instagram,
    Facebook,
    Twitter,
    Pinterest,
    Kuaishou,
    Sora,
    Xiaohongshu,
    Threads,
    LinkedIn,
    Reddit,
    Bilibili,
    Weibo,
    Lemon8,
    Zhihu,
    WeChat,
    Pipixia,
}

/// All supported platforms, in detection order.
pub const ALL_PLATFORMS: &[Platform] = &[
    Platform::TikTok,
    Platform::Douyin,
    Platform::YouTube,
    Platform::Instagram,
    Platform::Facebook,
    Platform::Twitter,
    Platform::Pinterest,
    Platform::Kuaishou,
    Platform::Sora,
    Platform::Xiaohongshu,
    Platform::Threads,
    Platform::LinkedIn,
    Platform::Reddit,
    Platform::Bilibili,
    Platform::Weibo,
    Platform::Lemon8,
    Platform::Zhihu,
    Platform::WeChat,
    Platform::Pipixia,
];

impl Platform {
    /// Lowercase identifier used in API payloads and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Douyin => "douyin",
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Pinterest => "pinterest",
            Platform::Kuaishou => "kuaishou",
            Platform::Sora => "sora",
            Platform::Xiaohongshu => "xiaohongshu",
            Platform::Threads => "threads",
            Platform::LinkedIn => "linkedin",
            Platform::Reddit => "reddit",
            Platform::Bilibili => "bilibili",
            Platform::Weibo => "weibo",
            Platform::Lemon8 => "lemon8",
            Platform::Zhihu => "zhihu",
            Platform::WeChat => "wechat",
            Platform::Pipixia => "pipixia",
        }
    }

    /// Human-readable name shown by the UI and the CLI.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::TikTok => "TikTok",
            Platform::Douyin => "Douyin",
            Platform::YouTube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::Facebook => "Facebook",
            Platform::Twitter => "X (Twitter)",
            Platform::Pinterest => "Pinterest",
            Platform::Kuaishou => "Kuaishou",
            Platform::Sora => "Sora",
            Platform::Xiaohongshu => "Xiaohongshu",
            Platform::Threads => "Threads",
            Platform::LinkedIn => "LinkedIn",
            Platform::Reddit => "Reddit",
            Platform::Bilibili => "Bilibili",
            Platform::Weibo => "Weibo",
            Platform::Lemon8 => "Lemon8",
            Platform::Zhihu => "Zhihu",
            Platform::WeChat => "WeChat",
            Platform::Pipixia => "Pipixia",
        }
    }

    /// Map a URL to its platform. First match wins; None means the URL is
    /// unrecognized and platform-specific flows must reject it.
    pub fn detect(url: &str) -> Option<Platform> {
        let url = url.to_lowercase();
        let has = |frag: &str| url.contains(frag);

        if has("tiktok.com") {
            return Some(Platform::TikTok);
        }
        if has("douyin.com") {
            return Some(Platform::Douyin);
        }
        if has("youtube.com") || has("youtu.be") {
            return Some(Platform::YouTube);
        }
        if has("instagram.com") {
            return Some(Platform::Instagram);
        }
        if has("facebook.com") || has("fb.watch") || has("fb.com") {
            return Some(Platform::Facebook);
        }
        if has("twitter.com") || has("x.com") {
            return Some(Platform::Twitter);
        }
        if has("pinterest.com") || has("pin.it") {
            return Some(Platform::Pinterest);
        }
        if has("kuaishou.com") || has("kwai.com") || has("gifshow.com") {
            return Some(Platform::Kuaishou);
        }
        // Sora lives under several OpenAI domains, including share links on
        // chatgpt.com whose path starts with /p/s_
        if (has("sora") && has("openai.com"))
            || has("sora.com")
            || has("sora.chatgpt.com")
            || (has("chatgpt.com") && has("/p/s_"))
        {
            return Some(Platform::Sora);
        }
        if has("xiaohongshu.com") || has("xhslink.com") {
            return Some(Platform::Xiaohongshu);
        }
        if has("threads.net") {
            return Some(Platform::Threads);
        }
        if has("linkedin.com") {
            return Some(Platform::LinkedIn);
        }
        if has("reddit.com") || has("redd.it") {
            return Some(Platform::Reddit);
        }
        if has("bilibili.com") || has("b23.tv") {
            return Some(Platform::Bilibili);
        }
        if has("weibo.com") || has("weibo.cn") {
            return Some(Platform::Weibo);
        }
        if has("lemon8-app.com") || has("lemon8.com") {
            return Some(Platform::Lemon8);
        }
        if has("zhihu.com") {
            return Some(Platform::Zhihu);
        }
        if has("weixin.qq.com") || has("mp.weixin") {
            return Some(Platform::WeChat);
        }
        if has("pipix.com") || has("pipixia") {
            return Some(Platform::Pipixia);
        }
        None
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the human-facing username (or platform-local id) from a URL.
///
/// Returns the first capture group of the platform's pattern, or None when
/// the URL doesn't carry one (e.g. short links that need a redirect hop).
pub fn extract_username(url: &str, platform: Platform) -> Option<String> {
    let pattern = match platform {
        Platform::TikTok => r"(?i)tiktok\.com/@([\w.-]+)",
        Platform::YouTube => r"(?i)youtube\.com/(?:@|c/|channel/|user/)([\w.-]+)",
        Platform::Instagram => r"(?i)instagram\.com/([\w.-]+)",
        Platform::Facebook => r"(?i)facebook\.com/([\w.-]+)",
        Platform::Twitter => r"(?i)(?:twitter|x)\.com/(\w+)",
        Platform::Pinterest => r"(?i)pinterest\.com/([\w.-]+)",
        Platform::Kuaishou => r"(?i)(?:kuaishou\.com/profile/|kwai\.com/@)([\w.-]+)",
        Platform::Xiaohongshu => r"(?i)xiaohongshu\.com/user/profile/(\w+)",
        Platform::Threads => r"(?i)threads\.net/@([\w.-]+)",
        Platform::LinkedIn => r"(?i)linkedin\.com/in/([\w.-]+)",
        Platform::Reddit => r"(?i)reddit\.com/(?:user|r)/([\w.-]+)",
        Platform::Bilibili => r"(?i)(?:space\.bilibili\.com|bilibili\.com/space)/(\d+)",
        Platform::Weibo => r"(?i)weibo\.com/(?:u/)?(\w+)",
        Platform::Lemon8 => r"(?i)lemon8[^\s]*/@([\w.-]+)",
        Platform::Zhihu => r"(?i)zhihu\.com/people/([\w.-]+)",
        Platform::Pipixia => r"(?i)pipix\.com/user/(\d+)",
        // Douyin user ids are extracted by the grabber itself (the common
        // share links are short links that resolve via redirect).
        Platform::Douyin | Platform::Sora | Platform::WeChat => return None,
    };
    let re = Regex::new(pattern).ok()?;
    re.captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether the URL looks like a profile/channel page rather than a single
/// post. Used to pick UI affordances only — not correctness-critical.
pub fn is_profile_url(url: &str) -> bool {
    let Some(platform) = Platform::detect(url) else {
        return false;
    };
    let patterns: &[&str] = match platform {
        Platform::TikTok => &[r"(?i)tiktok\.com/@[\w.-]+/?$", r"(?i)tiktok\.com/@[\w.-]+\?"],
        Platform::Douyin => &[r"(?i)douyin\.com/user/", r"(?i)v\.douyin\.com/"],
        Platform::YouTube => &[
            r"(?i)youtube\.com/@[\w.-]+",
            r"(?i)youtube\.com/c/",
            r"(?i)youtube\.com/channel/",
            r"(?i)youtube\.com/user/",
        ],
        Platform::Instagram => &[
            r"(?i)instagram\.com/[\w.-]+/?$",
            r"(?i)instagram\.com/[\w.-]+/?\?",
        ],
        Platform::Facebook => &[
            r"(?i)facebook\.com/[\w.-]+/?$",
            r"(?i)facebook\.com/profile\.php",
        ],
        Platform::Twitter => &[r"(?i)(?:twitter|x)\.com/\w+/?$", r"(?i)(?:twitter|x)\.com/\w+\?"],
        Platform::Pinterest => &[
            r"(?i)pinterest\.com/[\w.-]+/?$",
            r"(?i)pinterest\.com/[\w.-]+/[\w.-]+",
        ],
        Platform::Kuaishou => &[r"(?i)kuaishou\.com/profile/", r"(?i)kwai\.com/@"],
        Platform::Xiaohongshu => &[r"(?i)xiaohongshu\.com/user/profile/"],
        Platform::Threads => &[r"(?i)threads\.net/@[\w.-]+/?$"],
        Platform::LinkedIn => &[r"(?i)linkedin\.com/in/[\w.-]+"],
        Platform::Reddit => &[r"(?i)reddit\.com/user/[\w.-]+", r"(?i)reddit\.com/r/[\w.-]+"],
        Platform::Bilibili => &[r"(?i)bilibili\.com/space/", r"(?i)space\.bilibili\.com/"],
        Platform::Weibo => &[r"(?i)weibo\.com/u/", r"(?i)weibo\.com/\w+/?$"],
        Platform::Lemon8 => &[r"(?i)lemon8[^\s]*/@[\w.-]+/?$"],
        Platform::Zhihu => &[r"(?i)zhihu\.com/people/"],
        Platform::WeChat => &[r"(?i)mp\.weixin\.qq\.com/mp/profile"],
        Platform::Pipixia => &[r"(?i)pipix\.com/user/"],
        // Sora share links are always single generations, never a profile.
        Platform::Sora => &[],
    };
    patterns
        .iter()
        .any(|p| Regex::new(p).map(|re| re.is_match(url)).unwrap_or(false))
}
