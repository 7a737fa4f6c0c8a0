//! User lookup and follow graphs.

use log::{info, warn};
use serde_json::{json, Value};

use super::api::GraphqlRequest;
use super::models::{map_user_result, User};
use super::timeline::{bottom_cursor, instructions_at, users_in, PageLimit, TimelineEndpoint};
use crate::client::TwitterClient;
use crate::error::Result;

const FOLLOW_INSTRUCTIONS: &str = "/data/user/result/timeline/timeline/instructions";

fn follow_users(root: &Value) -> Result<Vec<User>> {
    Ok(users_in(instructions_at(root, FOLLOW_INSTRUCTIONS)))
}

fn follow_cursor(root: &Value) -> Option<String> {
    bottom_cursor(instructions_at(root, FOLLOW_INSTRUCTIONS))
}

pub(crate) const FOLLOWING: TimelineEndpoint<User> = TimelineEndpoint {
    operation: "Following",
    entities: follow_users,
    cursor: follow_cursor,
};

pub(crate) const FOLLOWERS: TimelineEndpoint<User> = TimelineEndpoint {
    operation: "Followers",
    entities: follow_users,
    cursor: follow_cursor,
};

pub(crate) const FOLLOWERS_YOU_KNOW: TimelineEndpoint<User> = TimelineEndpoint {
    operation: "FollowersYouKnow",
    entities: follow_users,
    cursor: follow_cursor,
};

impl TwitterClient {
    /// Looks up a user by screen name.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(User))`: If the user exists
    /// - `Ok(None)`: If the account is unknown or unavailable
    /// - `Err(ApidanceError)`: If the request failed
    pub async fn get_user_by_screen_name(&self, screen_name: &str) -> Result<Option<User>> {
        let screen_name = screen_name.trim_start_matches('@');
        info!("Looking up user by screen name: {}", screen_name);

        let variables = json!({
            "screen_name": screen_name,
            "withSafetyModeUserFields": true,
            "withHighlightedLabel": true,
        });
        let payload = self
            .execute(&GraphqlRequest::get("UserByScreenName", variables))
            .await?;

        let user = payload.pointer("/data/user/result").and_then(map_user_result);
        match &user {
            Some(user) => info!(
                "Found user {}: {} (@{}), followers_count: {}",
                user.id, user.name, user.username, user.followers_count
            ),
            None => warn!("User {} not found", screen_name),
        }
        Ok(user)
    }

    /// Accounts the given user follows.
    pub async fn get_following(&self, user_id: &str, limit: PageLimit) -> Result<Vec<User>> {
        info!("Fetching following list for user {}", user_id);
        self.collect(&FOLLOWING, follow_variables(user_id), limit)
            .await
    }

    /// Accounts following the given user.
    pub async fn get_followers(&self, user_id: &str, limit: PageLimit) -> Result<Vec<User>> {
        info!("Fetching followers of user {}", user_id);
        self.collect(&FOLLOWERS, follow_variables(user_id), limit)
            .await
    }

    /// Followers of the given user that the authenticated account also follows.
    pub async fn get_followers_you_know(
        &self,
        user_id: &str,
        limit: PageLimit,
    ) -> Result<Vec<User>> {
        info!("Fetching followers you know for user {}", user_id);
        self.collect(&FOLLOWERS_YOU_KNOW, follow_variables(user_id), limit)
            .await
    }
}

fn follow_variables(user_id: &str) -> Value {
    json!({
        "userId": user_id,
        "includePromotedContent": false,
    })
}
