//! # Apidance CLI
//!
//! A small command-line front end to the Apidance client, for manual checks.
//!
//! ## Environment Variables
//!
//! - `APIDANCE_API_KEY`: Apidance proxy API key (required)
//! - `X_AUTH_TOKEN`: Twitter/X auth token (required for `like` and `tweet`)
//! - `APIDANCE_BASE_URL`: Proxy base URL override
//! - `RUST_LOG`: Log level, e.g. `RUST_LOG=debug`
//!
//! ## Commands
//!
//! ```bash
//! apidance balance
//! apidance user <screen_name>
//! apidance tweets <screen_name> [count]
//! apidance list <list_id> [count]
//! apidance search <query> [count]
//! apidance following <user_id> [count]
//! apidance followers <user_id> [count]
//! apidance tweet-by-id <tweet_id>
//! apidance like <tweet_id>
//! apidance tweet <text>
//! ```
//!
//! `count` follows the library convention: `-1` fetches everything.

use log::error;
use serde::Serialize;

use apidance::{ApidanceConfig, ApidanceError, PageLimit, SearchProduct, TwitterClient};

const USAGE: &str = "usage: apidance <balance|user|tweets|list|search|following|followers|tweet-by-id|like|tweet> [args]";

fn print_json<T: Serialize>(value: &T) -> Result<(), ApidanceError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ApidanceError::Mapping(format!("failed to render output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn limit_arg(args: &[String], index: usize) -> PageLimit {
    args.get(index)
        .and_then(|raw| raw.parse::<i64>().ok())
        .map(PageLimit::from_desired)
        .unwrap_or_default()
}

fn required<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, ApidanceError> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| ApidanceError::Configuration(format!("missing argument <{}>\n{}", name, USAGE)))
}

async fn run(args: &[String]) -> Result<(), ApidanceError> {
    let command = required(args, 1, "command")?;
    let client = TwitterClient::new(ApidanceConfig::from_env()?)?;

    match command {
        "balance" => println!("{}", client.check_balance().await),
        "user" => print_json(&client.get_user_by_screen_name(required(args, 2, "screen_name")?).await?)?,
        "tweets" => print_json(
            &client
                .get_user_tweets_by_screen_name(required(args, 2, "screen_name")?, limit_arg(args, 3))
                .await?,
        )?,
        "list" => print_json(
            &client
                .get_list_latest_tweets(required(args, 2, "list_id")?, limit_arg(args, 3))
                .await?,
        )?,
        "search" => print_json(
            &client
                .search_timeline(required(args, 2, "query")?, SearchProduct::Latest, limit_arg(args, 3))
                .await?,
        )?,
        "following" => print_json(
            &client
                .get_following(required(args, 2, "user_id")?, limit_arg(args, 3))
                .await?,
        )?,
        "followers" => print_json(
            &client
                .get_followers(required(args, 2, "user_id")?, limit_arg(args, 3))
                .await?,
        )?,
        "tweet-by-id" => print_json(&client.tweet_result_by_rest_id(required(args, 2, "tweet_id")?).await?)?,
        "like" => println!("{}", client.favorite_tweet(required(args, 2, "tweet_id")?).await?),
        "tweet" => print_json(&client.create_tweet(required(args, 2, "text")?, None).await?)?,
        other => {
            return Err(ApidanceError::Configuration(format!(
                "unknown command '{}'\n{}",
                other, USAGE
            )))
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize the logging system
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if let Err(e) = run(&args).await {
        error!("Command failed: {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
