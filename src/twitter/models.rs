//! Data models and the JSON-to-model mapper.
//!
//! The proxy relays upstream GraphQL payloads as-is, and the same logical tweet
//! shows up in several shapes depending on the endpoint and API revision. The
//! mapper probes each known location in a fixed order (see
//! [`TWEET_SHAPE_PROBE_ORDER`]) and keeps only the fields the models define.

use chrono::DateTime;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApidanceError, Result};

/// Format of `legacy.created_at`, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Retweet nesting is at most two levels in practice; deeper chains are cut.
pub const MAX_RETWEET_DEPTH: usize = 5;

/// A Twitter/X account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub followers_count: u64,
    pub following_count: u64,
    /// Bio with `t.co` links replaced by their expanded form.
    pub description: Option<String>,
    /// Expanded profile website.
    pub profile_url: Option<String>,
    pub verified: bool,
    pub is_blue_verified: bool,
}

/// Author of a tweet: either the embedded account or just its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Author {
    User(User),
    Id(String),
}

impl Author {
    pub fn id(&self) -> &str {
        match self {
            Self::User(user) => &user.id,
            Self::Id(id) => id,
        }
    }
}

/// A media attachment.
///
/// `url` is the attachment's `t.co` link as it appears in the tweet text,
/// `expanded_url` the permalink it points to and `preview_url` the image
/// (`media_url_https`). Videos and GIFs also carry their playable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Media {
    Photo {
        url: String,
        expanded_url: Option<String>,
        preview_url: Option<String>,
    },
    Video {
        url: String,
        expanded_url: Option<String>,
        preview_url: Option<String>,
        /// Highest-bitrate mp4.
        video_url: Option<String>,
        duration_ms: Option<u64>,
    },
    AnimatedGif {
        url: String,
        expanded_url: Option<String>,
        preview_url: Option<String>,
        video_url: Option<String>,
    },
    Other {
        kind: String,
        url: String,
        expanded_url: Option<String>,
        preview_url: Option<String>,
    },
}

impl Media {
    pub fn url(&self) -> &str {
        match self {
            Self::Photo { url, .. }
            | Self::Video { url, .. }
            | Self::AnimatedGif { url, .. }
            | Self::Other { url, .. } => url,
        }
    }

    pub fn expanded_url(&self) -> Option<&str> {
        match self {
            Self::Photo { expanded_url, .. }
            | Self::Video { expanded_url, .. }
            | Self::AnimatedGif { expanded_url, .. }
            | Self::Other { expanded_url, .. } => expanded_url.as_deref(),
        }
    }

    pub fn preview_url(&self) -> Option<&str> {
        match self {
            Self::Photo { preview_url, .. }
            | Self::Video { preview_url, .. }
            | Self::AnimatedGif { preview_url, .. }
            | Self::Other { preview_url, .. } => preview_url.as_deref(),
        }
    }
}

/// A link inside tweet text. Some shapes only carry part of the triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlEntity {
    pub url: Option<String>,
    pub display_url: Option<String>,
    pub expanded_url: Option<String>,
}

/// An `@mention` inside tweet text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMention {
    pub id: Option<String>,
    pub name: Option<String>,
    pub screen_name: String,
}

/// A tweet, normalized from any of the known response shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    /// Unix timestamp in seconds.
    pub created_at: i64,
    pub author: Option<Author>,
    pub favorite_count: u64,
    pub retweet_count: u64,
    pub reply_count: u64,
    pub quote_count: u64,
    pub bookmark_count: u64,
    pub media: Option<Vec<Media>>,
    pub urls: Option<Vec<UrlEntity>>,
    pub user_mentions: Option<Vec<UserMention>>,
    /// Set from the presence of `retweeted_status_result`.
    pub is_retweet: bool,
    pub retweeted_tweet: Option<Box<Tweet>>,
}

/// Where the legacy block of a tweet result lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetShape {
    /// `result.legacy`
    Plain,
    /// `result.tweet.legacy` (`TweetWithVisibilityResults`)
    VisibilityWrapped,
    /// `result.result.legacy`
    NestedResult,
    /// The fragment is itself the legacy block (`id_str` + `created_at`).
    Flat,
}

/// Order in which [`TweetShape`]s are probed.
pub const TWEET_SHAPE_PROBE_ORDER: [TweetShape; 4] = [
    TweetShape::Plain,
    TweetShape::VisibilityWrapped,
    TweetShape::NestedResult,
    TweetShape::Flat,
];

impl TweetShape {
    /// Returns `(node, legacy)` when this shape matches the fragment.
    fn locate(self, result: &Value) -> Option<(&Value, &Value)> {
        let node = match self {
            Self::Plain => result,
            Self::VisibilityWrapped => result.get("tweet")?,
            Self::NestedResult => result.get("result")?,
            Self::Flat => {
                let flat = result.get("id_str").is_some() && result.get("created_at").is_some();
                return flat.then_some((result, result));
            }
        };
        let legacy = node.get("legacy")?;
        non_empty_object(legacy).then_some((node, legacy))
    }
}

/// Finds the first shape that yields a non-empty legacy block.
pub fn probe_tweet_shape(result: &Value) -> Option<(TweetShape, &Value, &Value)> {
    TWEET_SHAPE_PROBE_ORDER
        .iter()
        .find_map(|shape| shape.locate(result).map(|(node, legacy)| (*shape, node, legacy)))
}

/// Maps a tweet result fragment into a [`Tweet`].
///
/// Returns `Ok(None)` for empty, tombstoned or unrecognised fragments; upstream
/// legitimately returns those for deleted or unavailable tweets. An unparsable
/// `created_at` is an error.
pub fn map_tweet(result: &Value) -> Result<Option<Tweet>> {
    map_tweet_at_depth(result, 0)
}

fn map_tweet_at_depth(result: &Value, depth: usize) -> Result<Option<Tweet>> {
    if depth > MAX_RETWEET_DEPTH {
        warn!("Retweet nesting deeper than {}, dropping child", MAX_RETWEET_DEPTH);
        return Ok(None);
    }
    if !non_empty_object(result) {
        return Ok(None);
    }
    if matches!(
        str_at(result, "__typename"),
        Some("TweetTombstone") | Some("TweetUnavailable")
    ) {
        debug!("Skipping unavailable tweet fragment");
        return Ok(None);
    }

    let Some((shape, node, legacy)) = probe_tweet_shape(result) else {
        debug!("No known tweet shape matched the fragment");
        return Ok(None);
    };

    let id = str_at(legacy, "id_str")
        .or_else(|| str_at(node, "rest_id"))
        .map(String::from)
        .or_else(|| legacy.get("id").and_then(Value::as_u64).map(|n| n.to_string()))
        .unwrap_or_default();

    let created_at = parse_created_at(str_at(legacy, "created_at").unwrap_or_default())
        .map_err(|e| ApidanceError::Mapping(format!("tweet {}: {}", id, e)))?;

    let is_retweet = legacy.get("retweeted_status_result").is_some();
    let retweeted_tweet = match legacy.get("retweeted_status_result") {
        Some(envelope) => {
            let child = envelope.get("result").unwrap_or(envelope);
            map_tweet_at_depth(child, depth + 1)?.map(Box::new)
        }
        None => None,
    };

    debug!("Mapped tweet {} using {:?} shape", id, shape);

    Ok(Some(Tweet {
        text: tweet_text(node, legacy),
        created_at,
        author: tweet_author(node, legacy),
        favorite_count: count_at(legacy, "favorite_count"),
        retweet_count: count_at(legacy, "retweet_count"),
        reply_count: count_at(legacy, "reply_count"),
        quote_count: count_at(legacy, "quote_count"),
        bookmark_count: count_at(legacy, "bookmark_count"),
        media: non_empty(map_media(legacy)),
        urls: non_empty(map_urls(legacy.pointer("/entities/urls"))),
        user_mentions: non_empty(map_mentions(legacy)),
        is_retweet,
        retweeted_tweet,
        id,
    }))
}

/// Parses a `created_at` string into a Unix timestamp.
pub fn parse_created_at(raw: &str) -> std::result::Result<i64, String> {
    DateTime::parse_from_str(raw, CREATED_AT_FORMAT)
        .map(|dt| dt.timestamp())
        .map_err(|e| format!("unparsable created_at '{}': {}", raw, e))
}

/// Note text > legacy `full_text` > plain `text`.
fn tweet_text(node: &Value, legacy: &Value) -> String {
    node.pointer("/note_tweet/note_tweet_results/result/text")
        .and_then(Value::as_str)
        .or_else(|| str_at(legacy, "full_text"))
        .or_else(|| str_at(legacy, "text"))
        .or_else(|| str_at(node, "text"))
        .unwrap_or_default()
        .to_string()
}

fn tweet_author(node: &Value, legacy: &Value) -> Option<Author> {
    if let Some(user) = node
        .pointer("/core/user_results/result")
        .and_then(map_user_result)
    {
        return Some(Author::User(user));
    }
    if let Some(user) = legacy.get("user").and_then(map_user_result) {
        return Some(Author::User(user));
    }
    str_at(legacy, "user_id_str").map(|id| Author::Id(id.to_string()))
}

fn map_media(legacy: &Value) -> Vec<Media> {
    let items = legacy
        .pointer("/extended_entities/media")
        .or_else(|| legacy.pointer("/entities/media"))
        .and_then(Value::as_array);

    items
        .map(|items| items.iter().filter_map(map_media_item).collect())
        .unwrap_or_default()
}

fn map_media_item(item: &Value) -> Option<Media> {
    let kind = str_at(item, "type").unwrap_or("photo");
    let preview_url = str_at(item, "media_url_https")
        .or_else(|| str_at(item, "media_url"))
        .map(String::from);
    let expanded_url = str_at(item, "expanded_url").map(String::from);
    // Fragments without a t.co link fall back to the permalink, then the image.
    let url = str_at(item, "url")
        .map(String::from)
        .or_else(|| expanded_url.clone())
        .or_else(|| preview_url.clone())?;

    let media = match kind {
        "photo" => Media::Photo {
            url,
            expanded_url,
            preview_url,
        },
        "video" => Media::Video {
            url,
            expanded_url,
            preview_url,
            video_url: best_video_variant(item),
            duration_ms: item
                .pointer("/video_info/duration_millis")
                .and_then(Value::as_u64),
        },
        "animated_gif" => Media::AnimatedGif {
            url,
            expanded_url,
            preview_url,
            video_url: item
                .pointer("/video_info/variants/0/url")
                .and_then(Value::as_str)
                .map(String::from),
        },
        other => Media::Other {
            kind: other.to_string(),
            url,
            expanded_url,
            preview_url,
        },
    };
    Some(media)
}

/// Highest-bitrate variant; the `.m3u8` variant has no bitrate and loses.
fn best_video_variant(item: &Value) -> Option<String> {
    item.pointer("/video_info/variants")?
        .as_array()?
        .iter()
        .filter_map(|variant| {
            let url = str_at(variant, "url")?;
            let bitrate = variant.get("bitrate").and_then(Value::as_i64).unwrap_or(-1);
            Some((bitrate, url))
        })
        .max_by_key(|(bitrate, _)| *bitrate)
        .map(|(_, url)| url.to_string())
}

fn map_urls(urls: Option<&Value>) -> Vec<UrlEntity> {
    urls.and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .map(|u| UrlEntity {
                    url: str_at(u, "url").map(String::from),
                    display_url: str_at(u, "display_url").map(String::from),
                    expanded_url: str_at(u, "expanded_url").map(String::from),
                })
                .filter(|u| u.url.is_some() || u.display_url.is_some() || u.expanded_url.is_some())
                .collect()
        })
        .unwrap_or_default()
}

fn map_mentions(legacy: &Value) -> Vec<UserMention> {
    legacy
        .pointer("/entities/user_mentions")
        .and_then(Value::as_array)
        .map(|mentions| {
            mentions
                .iter()
                .filter_map(|m| {
                    Some(UserMention {
                        screen_name: str_at(m, "screen_name")?.to_string(),
                        id: str_at(m, "id_str")
                            .map(String::from)
                            .or_else(|| m.get("id").and_then(Value::as_u64).map(|n| n.to_string())),
                        name: str_at(m, "name").map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Maps a user result fragment, or `None` when it is empty or unavailable.
pub fn map_user_result(fragment: &Value) -> Option<User> {
    if !non_empty_object(fragment) || str_at(fragment, "__typename") == Some("UserUnavailable") {
        return None;
    }
    let user = map_user(fragment);
    (!user.id.is_empty() || !user.username.is_empty()).then_some(user)
}

/// Maps a user fragment into a [`User`].
///
/// Accepts the GraphQL shape (`rest_id` + `legacy`, with `name`/`screen_name`
/// either in `legacy` or in the newer `core` block) as well as a flat legacy
/// user object. Missing counts are zero; missing text fields are `None`.
pub fn map_user(fragment: &Value) -> User {
    let legacy = fragment
        .get("legacy")
        .filter(|l| non_empty_object(l))
        .unwrap_or(fragment);
    let core = fragment.get("core").unwrap_or(&Value::Null);

    let id = str_at(fragment, "rest_id")
        .or_else(|| str_at(legacy, "id_str"))
        .or_else(|| str_at(fragment, "id_str"))
        .map(String::from)
        .or_else(|| fragment.get("id").and_then(Value::as_u64).map(|n| n.to_string()))
        .or_else(|| str_at(fragment, "id").map(String::from))
        .unwrap_or_default();

    let description = str_at(legacy, "description")
        .or_else(|| fragment.pointer("/profile_bio/description").and_then(Value::as_str))
        .filter(|d| !d.is_empty())
        .map(|d| expand_short_urls(d, legacy.pointer("/entities/description/urls")));

    let profile_url = legacy
        .pointer("/entities/url/urls/0/expanded_url")
        .and_then(Value::as_str)
        .or_else(|| str_at(legacy, "url"))
        .filter(|u| !u.is_empty())
        .map(String::from);

    User {
        id,
        name: str_at(core, "name")
            .or_else(|| str_at(legacy, "name"))
            .unwrap_or_default()
            .to_string(),
        username: str_at(core, "screen_name")
            .or_else(|| str_at(legacy, "screen_name"))
            .unwrap_or_default()
            .to_string(),
        followers_count: count_at(legacy, "followers_count"),
        following_count: count_at(legacy, "friends_count"),
        description,
        profile_url,
        verified: legacy
            .get("verified")
            .or_else(|| fragment.pointer("/verification/verified"))
            .and_then(Value::as_bool)
            .unwrap_or(false),
        is_blue_verified: fragment
            .get("is_blue_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Replaces each short `url` of the entity list with its `expanded_url`.
///
/// The text is scanned once, trying the longest short link first at each
/// position, so links sharing a prefix and expansions that contain a short
/// link are never rewritten twice.
fn expand_short_urls(text: &str, urls: Option<&Value>) -> String {
    let mut links: Vec<(String, String)> = map_urls(urls)
        .into_iter()
        .filter_map(|entity| match (entity.url, entity.expanded_url) {
            (Some(short), Some(expanded)) if !short.is_empty() => Some((short, expanded)),
            _ => None,
        })
        .collect();
    if links.is_empty() {
        return text.to_string();
    }
    links.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut expanded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        match links.iter().find(|(short, _)| rest.starts_with(short.as_str())) {
            Some((short, long)) => {
                expanded.push_str(long);
                rest = &rest[short.len()..];
            }
            None => {
                expanded.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    expanded
}

fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Counter value; absent, negative or malformed counts are zero.
fn count_at(value: &Value, key: &str) -> u64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn non_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| !obj.is_empty())
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
