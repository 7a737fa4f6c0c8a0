//! The client that owns the HTTP session and configuration.

use log::info;
use reqwest::Client;

use crate::config::{mask_secret, ApidanceConfig};
use crate::error::Result;

/// Client for the Twitter/X GraphQL API via the Apidance proxy.
///
/// One client owns one HTTP session for its lifetime. Calls are not serialized
/// internally: concurrent calls on a shared client are independent, and
/// callers that need ordering (posting, for instance) must serialize them.
///
/// # Example
///
/// ```rust,no_run
/// use apidance::{ApidanceConfig, PageLimit, TwitterClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), apidance::ApidanceError> {
///     let client = TwitterClient::new(ApidanceConfig::new("your_api_key"))?;
///     if let Some(user) = client.get_user_by_screen_name("jack").await? {
///         let tweets = client.get_user_tweets(&user.id, PageLimit::Count(40)).await?;
///         println!("{} tweets", tweets.len());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TwitterClient {
    pub(crate) http: Client,
    pub(crate) config: ApidanceConfig,
}

impl TwitterClient {
    /// Validates the configuration and builds the HTTP session.
    ///
    /// # Returns
    ///
    /// - `Ok(TwitterClient)`: If the credentials are well-formed
    /// - `Err(ApidanceError::Configuration)`: If the API key is empty or the auth token is malformed
    pub fn new(config: ApidanceConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder().timeout(config.timeout).build()?;
        info!(
            "Created Apidance client for {} with API key {}",
            config.base_url,
            mask_secret(&config.api_key)
        );
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApidanceConfig {
        &self.config
    }
}
