//! # Apidance
//!
//! A client library for the Apidance proxy, which exposes the internal
//! GraphQL API of Twitter/X. It authenticates requests, turns method calls into
//! GraphQL operations, retries transient failures with exponential backoff,
//! follows cursor-paginated timelines and normalizes the inconsistently shaped
//! payloads into a few stable models.
//!
//! ## Features
//!
//! - Typed errors classified from upstream and proxy error codes
//! - Exponential backoff with a configurable attempt budget
//! - Cursor pagination with de-duplication across pages
//! - Tolerant mapping of several known tweet and user shapes
//! - Long-form posts with markdown emphasis converted to rich text
//!
//! ## Configuration
//!
//! The client takes an explicit [`ApidanceConfig`]. Binaries can build one
//! from the environment with [`ApidanceConfig::from_env`]:
//! - `APIDANCE_API_KEY`: proxy API key (required)
//! - `X_AUTH_TOKEN`: upstream auth token, needed for favoriting and posting
//! - `APIDANCE_BASE_URL`: proxy base URL override
//!
//! ## Operations
//!
//! - search, user lookup, user timeline, list timeline
//! - following, followers, followers you know
//! - fetch tweet by id, favorite, create tweet, create long-form tweet
//! - advisory balance check

pub mod client;
pub mod config;
pub mod error;
pub mod richtext;
pub mod twitter;

// Re-export commonly used types and functions
pub use client::TwitterClient;
pub use config::{ApidanceConfig, RetryPolicy};
pub use error::{ApidanceError, Result};
pub use richtext::{parse_markdown_to_richtext, RichtextTag, RichtextType};
pub use twitter::{
    Author, Media, PageLimit, SearchProduct, Tweet, UrlEntity, User, UserMention,
};

#[cfg(test)]
mod tests;
