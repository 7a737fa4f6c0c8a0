//! Cursor pagination over timeline-shaped endpoints.
//!
//! Each endpoint nests its timeline at a different depth, so a
//! [`TimelineEndpoint`] pairs the GraphQL operation with its own entity
//! extractor and cursor extractor. The shared helpers below only understand the
//! parts that are common once the `instructions` array has been found.

use std::collections::HashSet;

use log::{debug, info};
use serde_json::{json, Value};

use super::api::GraphqlRequest;
use super::models::{map_tweet, map_user_result, Tweet, User};
use crate::client::TwitterClient;
use crate::error::Result;

/// Upstream never returns more than this many entries per page.
pub const PAGE_SIZE: usize = 20;

/// How many entities a paginated operation should collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// Everything the timeline yields.
    All,
    /// At most this many.
    Count(usize),
}

impl PageLimit {
    /// Maps the `-1 means all` convention onto a limit.
    pub fn from_desired(count: i64) -> Self {
        if count < 0 {
            Self::All
        } else {
            Self::Count(count as usize)
        }
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self::Count(PAGE_SIZE)
    }
}

/// Entities that can be deduplicated across pages.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Tweet {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for User {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A paginated GraphQL operation and how to read one page of it.
pub(crate) struct TimelineEndpoint<T> {
    pub operation: &'static str,
    pub entities: fn(&Value) -> Result<Vec<T>>,
    pub cursor: fn(&Value) -> Option<String>,
}

impl TwitterClient {
    /// Collects entities page by page until the limit is reached, a page adds
    /// nothing new, or no bottom cursor can be found.
    ///
    /// Entities are deduplicated by id; the first occurrence wins and arrival
    /// order is kept.
    pub(crate) async fn collect<T: Identified>(
        &self,
        endpoint: &TimelineEndpoint<T>,
        variables: Value,
        limit: PageLimit,
    ) -> Result<Vec<T>> {
        if limit == PageLimit::Count(0) {
            return Ok(Vec::new());
        }

        let mut collected: Vec<T> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut page_count: u32 = 0;

        loop {
            let mut page_variables = variables.clone();
            if let Some(vars) = page_variables.as_object_mut() {
                vars.insert("count".to_string(), json!(PAGE_SIZE));
                if let Some(cursor) = &cursor {
                    vars.insert("cursor".to_string(), json!(cursor));
                }
            }

            let payload = self
                .execute(&GraphqlRequest::get(endpoint.operation, page_variables))
                .await?;
            page_count += 1;

            let mut added = 0usize;
            for entity in (endpoint.entities)(&payload)? {
                if seen.insert(entity.id().to_string()) {
                    collected.push(entity);
                    added += 1;
                }
            }
            debug!(
                "Page {} of '{}' added {} new entities ({} total)",
                page_count,
                endpoint.operation,
                added,
                collected.len()
            );

            if let PageLimit::Count(wanted) = limit {
                if collected.len() >= wanted {
                    collected.truncate(wanted);
                    break;
                }
            }

            if added == 0 {
                debug!("Page {} of '{}' added nothing, stopping", page_count, endpoint.operation);
                break;
            }

            match (endpoint.cursor)(&payload) {
                Some(next) => {
                    debug!("Next cursor for '{}': {}", endpoint.operation, next);
                    cursor = Some(next);
                }
                None => {
                    debug!("No bottom cursor on page {} of '{}'", page_count, endpoint.operation);
                    break;
                }
            }
        }

        info!(
            "Collected {} entities from '{}' ({} pages)",
            collected.len(),
            endpoint.operation,
            page_count
        );
        Ok(collected)
    }
}

/// The `instructions` array at `path`, or an empty slice.
pub(crate) fn instructions_at<'a>(root: &'a Value, path: &str) -> &'a [Value] {
    root.pointer(path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Entries from `TimelineAddEntries` and `TimelinePinEntry` instructions, in
/// instruction order.
pub(crate) fn timeline_entries(instructions: &[Value]) -> Vec<&Value> {
    let mut entries = Vec::new();
    for instruction in instructions {
        if let Some(list) = instruction.get("entries").and_then(Value::as_array) {
            entries.extend(list.iter());
        } else if instruction.get("type").and_then(Value::as_str) == Some("TimelinePinEntry") {
            if let Some(entry) = instruction.get("entry") {
                entries.push(entry);
            }
        }
    }
    entries
}

/// `itemContent` objects of an entry: the entry's own, or those of a module.
fn item_contents(entry: &Value) -> Vec<&Value> {
    let content = match entry.get("content") {
        Some(content) => content,
        None => return Vec::new(),
    };
    if let Some(item) = content.get("itemContent") {
        return vec![item];
    }
    content
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.pointer("/item/itemContent"))
                .collect()
        })
        .unwrap_or_default()
}

fn item_type(item: &Value) -> Option<&str> {
    item.get("itemType")
        .or_else(|| item.get("__typename"))
        .and_then(Value::as_str)
}

/// Maps every `TimelineTweet` item of the instructions.
pub(crate) fn tweets_in(instructions: &[Value]) -> Result<Vec<Tweet>> {
    let mut tweets = Vec::new();
    for entry in timeline_entries(instructions) {
        for item in item_contents(entry) {
            if item_type(item) != Some("TimelineTweet") {
                continue;
            }
            if let Some(result) = item.pointer("/tweet_results/result") {
                if let Some(tweet) = map_tweet(result)? {
                    tweets.push(tweet);
                }
            }
        }
    }
    Ok(tweets)
}

/// Maps every `TimelineUser` item of the instructions.
pub(crate) fn users_in(instructions: &[Value]) -> Vec<User> {
    timeline_entries(instructions)
        .into_iter()
        .flat_map(item_contents)
        .filter(|item| item_type(item) == Some("TimelineUser"))
        .filter_map(|item| item.pointer("/user_results/result"))
        .filter_map(map_user_result)
        .collect()
}

/// Value of the `Bottom` cursor, whether added as an entry or replaced by a
/// `TimelineReplaceEntry` instruction.
pub(crate) fn bottom_cursor(instructions: &[Value]) -> Option<String> {
    let replaced = instructions
        .iter()
        .filter(|i| i.get("type").and_then(Value::as_str) == Some("TimelineReplaceEntry"))
        .filter_map(|i| i.get("entry"));

    timeline_entries(instructions)
        .into_iter()
        .chain(replaced)
        .filter_map(|entry| entry.get("content"))
        .find(|content| content.get("cursorType").and_then(Value::as_str) == Some("Bottom"))
        .and_then(|content| content.get("value"))
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(String::from)
}
