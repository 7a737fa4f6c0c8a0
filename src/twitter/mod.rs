//! Twitter/X GraphQL integration through the Apidance proxy.
//!
//! This module contains the request/retry engine, the response classifier,
//! the pagination driver, the model mapper and the operations built on them.

mod api;
pub mod classify;
pub mod models;
mod search;
mod timeline;
mod tweets;
mod users;

// Re-export public API
pub use classify::{classify, Transient, Verdict};
pub use models::{
    map_tweet, map_user, map_user_result, probe_tweet_shape, Author, Media, Tweet, TweetShape,
    UrlEntity, User, UserMention, TWEET_SHAPE_PROBE_ORDER,
};
pub use search::SearchProduct;
pub use timeline::{Identified, PageLimit, PAGE_SIZE};

// Crate-internal re-exports (used by tests)
#[allow(unused_imports)]
pub(crate) use api::parse_balance;
