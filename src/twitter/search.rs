//! Tweet search.

use log::info;
use serde_json::{json, Value};

use super::models::Tweet;
use super::timeline::{bottom_cursor, instructions_at, tweets_in, PageLimit, TimelineEndpoint};
use crate::client::TwitterClient;
use crate::error::Result;

const SEARCH_INSTRUCTIONS: &str = "/data/search_by_raw_query/search_timeline/timeline/instructions";

/// Result tab of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchProduct {
    Top,
    #[default]
    Latest,
    Photos,
    Videos,
}

impl SearchProduct {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Latest => "Latest",
            Self::Photos => "Photos",
            Self::Videos => "Videos",
        }
    }
}

fn search_tweets(root: &Value) -> Result<Vec<Tweet>> {
    tweets_in(instructions_at(root, SEARCH_INSTRUCTIONS))
}

fn search_cursor(root: &Value) -> Option<String> {
    bottom_cursor(instructions_at(root, SEARCH_INSTRUCTIONS))
}

pub(crate) const SEARCH_TIMELINE: TimelineEndpoint<Tweet> = TimelineEndpoint {
    operation: "SearchTimeline",
    entities: search_tweets,
    cursor: search_cursor,
};

impl TwitterClient {
    /// Searches tweets with Twitter's advanced search syntax.
    ///
    /// # Parameters
    ///
    /// - `query`: The raw search query, e.g. `BTC from:someone min_faves:1`
    /// - `product`: Which result tab to read
    /// - `limit`: How many tweets to collect
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Tweet>)`: Matching tweets, possibly empty
    /// - `Err(ApidanceError)`: If the request failed
    pub async fn search_timeline(
        &self,
        query: &str,
        product: SearchProduct,
        limit: PageLimit,
    ) -> Result<Vec<Tweet>> {
        info!(
            "Searching tweets for query '{}' ({})",
            query,
            product.as_str()
        );
        let variables = json!({
            "rawQuery": query,
            "querySource": "typed_query",
            "product": product.as_str(),
            "includePromotedContent": false,
        });
        self.collect(&SEARCH_TIMELINE, variables, limit).await
    }
}
