//! Tweet operations: timelines, lookup by id, favoriting and posting.

use log::{debug, info, warn};
use serde_json::{json, Value};

use super::api::GraphqlRequest;
use super::classify::CODE_ALREADY_FAVORITED;
use super::models::{map_tweet, Tweet};
use super::timeline::{bottom_cursor, instructions_at, tweets_in, PageLimit, TimelineEndpoint};
use crate::client::TwitterClient;
use crate::error::Result;
use crate::richtext::parse_markdown_to_richtext;

const USER_TWEETS_INSTRUCTIONS: [&str; 2] = [
    "/data/user/result/timeline_v2/timeline/instructions",
    "/data/user/result/timeline/timeline/instructions",
];
const LIST_INSTRUCTIONS: &str = "/data/list/tweets_timeline/timeline/instructions";

/// `timeline_v2` on older revisions, `timeline` on newer ones.
fn user_tweets_instructions(root: &Value) -> &[Value] {
    USER_TWEETS_INSTRUCTIONS
        .iter()
        .map(|path| instructions_at(root, path))
        .find(|instructions| !instructions.is_empty())
        .unwrap_or(&[])
}

fn user_tweets(root: &Value) -> Result<Vec<Tweet>> {
    tweets_in(user_tweets_instructions(root))
}

fn user_tweets_cursor(root: &Value) -> Option<String> {
    bottom_cursor(user_tweets_instructions(root))
}

fn list_tweets(root: &Value) -> Result<Vec<Tweet>> {
    tweets_in(instructions_at(root, LIST_INSTRUCTIONS))
}

fn list_cursor(root: &Value) -> Option<String> {
    bottom_cursor(instructions_at(root, LIST_INSTRUCTIONS))
}

pub(crate) const USER_TWEETS: TimelineEndpoint<Tweet> = TimelineEndpoint {
    operation: "UserTweets",
    entities: user_tweets,
    cursor: user_tweets_cursor,
};

pub(crate) const LIST_LATEST_TWEETS: TimelineEndpoint<Tweet> = TimelineEndpoint {
    operation: "ListLatestTweetsTimeline",
    entities: list_tweets,
    cursor: list_cursor,
};

impl TwitterClient {
    /// Tweets posted by a user, pinned tweet included.
    pub async fn get_user_tweets(&self, user_id: &str, limit: PageLimit) -> Result<Vec<Tweet>> {
        info!("Fetching tweets of user {}", user_id);
        let variables = json!({
            "userId": user_id,
            "includePromotedContent": false,
            "withQuickPromoteEligibilityTweetFields": true,
            "withVoice": true,
            "withV2Timeline": true,
        });
        self.collect(&USER_TWEETS, variables, limit).await
    }

    /// Resolves a screen name, then fetches that user's tweets.
    ///
    /// An unknown screen name yields an empty list.
    pub async fn get_user_tweets_by_screen_name(
        &self,
        screen_name: &str,
        limit: PageLimit,
    ) -> Result<Vec<Tweet>> {
        match self.get_user_by_screen_name(screen_name).await? {
            Some(user) => self.get_user_tweets(&user.id, limit).await,
            None => Ok(Vec::new()),
        }
    }

    /// Latest tweets of a list.
    pub async fn get_list_latest_tweets(
        &self,
        list_id: &str,
        limit: PageLimit,
    ) -> Result<Vec<Tweet>> {
        info!("Fetching latest tweets of list {}", list_id);
        let variables = json!({
            "listId": list_id,
            "includePromotedContent": false,
        });
        self.collect(&LIST_LATEST_TWEETS, variables, limit).await
    }

    /// Fetches a single tweet by id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Tweet))`: If the tweet is available
    /// - `Ok(None)`: If it was deleted, withheld or never existed
    /// - `Err(ApidanceError)`: If the request or the mapping failed
    pub async fn tweet_result_by_rest_id(&self, tweet_id: &str) -> Result<Option<Tweet>> {
        info!("Fetching tweet {}", tweet_id);
        let variables = json!({
            "tweetId": tweet_id,
            "withCommunity": false,
            "includePromotedContent": false,
            "withVoice": false,
        });
        let payload = self
            .execute(&GraphqlRequest::get("TweetResultByRestId", variables))
            .await?;

        match payload.pointer("/data/tweetResult/result") {
            Some(result) => map_tweet(result),
            None => {
                warn!("Tweet {} not found", tweet_id);
                Ok(None)
            }
        }
    }

    /// Likes a tweet. Requires an auth token.
    ///
    /// Liking an already liked tweet counts as success.
    pub async fn favorite_tweet(&self, tweet_id: &str) -> Result<bool> {
        info!("Favoriting tweet {}", tweet_id);
        let payload = self
            .execute(&GraphqlRequest::post_privileged(
                "FavoriteTweet",
                json!({ "tweet_id": tweet_id }),
            ))
            .await?;

        let already_favorited = payload
            .get("errors")
            .and_then(Value::as_array)
            .is_some_and(|errors| {
                errors
                    .iter()
                    .any(|e| e.get("code").and_then(Value::as_i64) == Some(CODE_ALREADY_FAVORITED))
            });
        let done = already_favorited
            || payload.pointer("/data/favorite_tweet").and_then(Value::as_str) == Some("Done");
        info!("Favorite of tweet {} done: {}", tweet_id, done);
        Ok(done)
    }

    /// Posts a tweet, optionally as a reply. Requires an auth token.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(id))`: The id of the new tweet
    /// - `Ok(None)`: If the response did not carry an id
    pub async fn create_tweet(
        &self,
        text: &str,
        reply_to_tweet_id: Option<&str>,
    ) -> Result<Option<String>> {
        info!("Creating tweet ({} characters)", text.chars().count());
        let mut variables = json!({
            "tweet_text": text,
            "dark_request": false,
            "media": { "media_entities": [], "possibly_sensitive": false },
            "semantic_annotation_ids": [],
        });
        attach_reply(&mut variables, reply_to_tweet_id);

        let payload = self
            .execute(&GraphqlRequest::post_privileged("CreateTweet", variables))
            .await?;
        Ok(created_tweet_id(
            &payload,
            "/data/create_tweet/tweet_results/result/rest_id",
        ))
    }

    /// Posts a long-form (note) tweet. Requires an auth token.
    ///
    /// With `use_richtext`, markdown emphasis in `text` is turned into rich
    /// text tags and the markers are stripped from the posted text.
    pub async fn create_note_tweet(
        &self,
        text: &str,
        use_richtext: bool,
        reply_to_tweet_id: Option<&str>,
    ) -> Result<Option<String>> {
        let (plain_text, tags) = if use_richtext {
            parse_markdown_to_richtext(text)
        } else {
            (text.to_string(), Vec::new())
        };
        info!(
            "Creating note tweet ({} characters, {} richtext tags)",
            plain_text.chars().count(),
            tags.len()
        );

        let mut variables = json!({
            "tweet_text": plain_text,
            "richtext_options": { "richtext_tags": tags },
            "dark_request": false,
            "media": { "media_entities": [], "possibly_sensitive": false },
            "semantic_annotation_ids": [],
        });
        attach_reply(&mut variables, reply_to_tweet_id);

        let payload = self
            .execute(&GraphqlRequest::post_privileged("CreateNoteTweet", variables))
            .await?;
        Ok(created_tweet_id(
            &payload,
            "/data/notetweet_create/tweet_results/result/rest_id",
        ))
    }
}

fn attach_reply(variables: &mut Value, reply_to_tweet_id: Option<&str>) {
    if let (Some(reply_to), Some(vars)) = (reply_to_tweet_id, variables.as_object_mut()) {
        vars.insert(
            "reply".to_string(),
            json!({
                "in_reply_to_tweet_id": reply_to,
                "exclude_reply_user_ids": [],
            }),
        );
    }
}

fn created_tweet_id(payload: &Value, pointer: &str) -> Option<String> {
    let id = payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(String::from);
    match &id {
        Some(id) => info!("Created tweet {}", id),
        None => debug!("Create response carried no tweet id"),
    }
    id
}
