//! # Tests Module
//!
//! Unit tests for the classifier, mapper, rich text and configuration, and
//! integration tests for the retry engine and pagination driver against a
//! local `wiremock` server standing in for the Apidance proxy.
//!
//! ## Test Environment
//!
//! Retry delays are shrunk to a few milliseconds so exhausting a budget stays
//! fast. No test talks to the real proxy.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::MockServer;

use crate::config::{ApidanceConfig, RetryPolicy};
use crate::TwitterClient;

mod pagination;

pub(crate) const TEST_API_KEY: &str = "test_api_key_0123456789";
pub(crate) const TEST_AUTH_TOKEN: &str = "0123456789abcdef0123456789abcdef01234567";
pub(crate) const CREATED_AT: &str = "Wed Oct 10 20:19:24 +0000 2018";
pub(crate) const CREATED_AT_EPOCH: i64 = 1_539_202_764;

/// Retry policy with millisecond delays.
pub(crate) fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        backoff_factor: 2.0,
        max_delay: Duration::from_millis(5),
    }
}

/// Client pointed at the mock server, without auth token.
pub(crate) fn test_client(server: &MockServer, max_attempts: u32) -> TwitterClient {
    let config = ApidanceConfig::new(TEST_API_KEY)
        .with_base_url(server.uri())
        .with_retry(fast_retry(max_attempts));
    TwitterClient::new(config).unwrap()
}

/// Client pointed at the mock server, with a valid auth token.
pub(crate) fn privileged_client(server: &MockServer, max_attempts: u32) -> TwitterClient {
    let config = ApidanceConfig::new(TEST_API_KEY)
        .with_auth_token(TEST_AUTH_TOKEN)
        .with_base_url(server.uri())
        .with_retry(fast_retry(max_attempts));
    TwitterClient::new(config).unwrap()
}

/// A user result in the GraphQL shape.
pub(crate) fn user_result(id: &str, screen_name: &str) -> Value {
    json!({
        "__typename": "User",
        "rest_id": id,
        "is_blue_verified": false,
        "legacy": {
            "name": format!("Name of {}", screen_name),
            "screen_name": screen_name,
            "followers_count": 10,
            "friends_count": 20,
            "description": "",
        }
    })
}

/// A tweet result in the plain `result.legacy` shape.
pub(crate) fn tweet_result(id: &str, text: &str) -> Value {
    json!({
        "__typename": "Tweet",
        "rest_id": id,
        "core": { "user_results": { "result": user_result("42", "author") } },
        "legacy": {
            "id_str": id,
            "full_text": text,
            "created_at": CREATED_AT,
            "user_id_str": "42",
            "favorite_count": 1,
            "retweet_count": 0,
            "reply_count": 0,
            "quote_count": 0,
        }
    })
}

pub(crate) fn tweet_entry(id: &str) -> Value {
    json!({
        "entryId": format!("tweet-{}", id),
        "content": {
            "entryType": "TimelineTimelineItem",
            "itemContent": {
                "itemType": "TimelineTweet",
                "__typename": "TimelineTweet",
                "tweet_results": { "result": tweet_result(id, &format!("tweet {}", id)) }
            }
        }
    })
}

pub(crate) fn user_entry(id: &str) -> Value {
    json!({
        "entryId": format!("user-{}", id),
        "content": {
            "entryType": "TimelineTimelineItem",
            "itemContent": {
                "itemType": "TimelineUser",
                "__typename": "TimelineUser",
                "user_results": { "result": user_result(id, &format!("user{}", id)) }
            }
        }
    })
}

pub(crate) fn cursor_entry(kind: &str, value: &str) -> Value {
    json!({
        "entryId": format!("cursor-{}-{}", kind.to_lowercase(), value),
        "content": {
            "entryType": "TimelineTimelineCursor",
            "__typename": "TimelineTimelineCursor",
            "cursorType": kind,
            "value": value,
        }
    })
}

/// Instructions holding the given entries plus an optional bottom cursor.
pub(crate) fn instructions(mut entries: Vec<Value>, bottom: Option<&str>) -> Value {
    entries.insert(0, cursor_entry("Top", "top-cursor"));
    if let Some(bottom) = bottom {
        entries.push(cursor_entry("Bottom", bottom));
    }
    json!([
        { "type": "TimelineClearCache" },
        { "type": "TimelineAddEntries", "entries": entries },
    ])
}

/// A `UserTweets` page.
pub(crate) fn user_tweets_page(ids: &[&str], bottom: Option<&str>) -> Value {
    let entries = ids.iter().map(|id| tweet_entry(id)).collect();
    json!({
        "data": { "user": { "result": {
            "__typename": "User",
            "timeline_v2": { "timeline": { "instructions": instructions(entries, bottom) } }
        } } }
    })
}

/// A `Followers`/`Following` page.
pub(crate) fn follow_page(ids: &[&str], bottom: Option<&str>) -> Value {
    let entries = ids.iter().map(|id| user_entry(id)).collect();
    json!({
        "data": { "user": { "result": {
            "__typename": "User",
            "timeline": { "timeline": { "instructions": instructions(entries, bottom) } }
        } } }
    })
}

/// Reads the JSON `variables` query parameter of a GET request.
pub(crate) fn request_variables(request: &wiremock::Request) -> Value {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == "variables")
        .and_then(|(_, value)| serde_json::from_str(&value).ok())
        .unwrap_or(Value::Null)
}
