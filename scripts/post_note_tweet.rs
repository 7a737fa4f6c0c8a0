//! Long-Form Tweet Posting Script
//!
//! This script posts a note tweet through the Apidance proxy. The text may use
//! markdown emphasis (`**bold**`, `*italic*`), which is converted to rich text.
//! Requires APIDANCE_API_KEY and X_AUTH_TOKEN environment variables.

use std::io::{self, Read, Write};

use apidance::{parse_markdown_to_richtext, ApidanceConfig, TwitterClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    println!("📝 Long-Form Tweet Posting Tool");
    println!("===============================");

    let config = match ApidanceConfig::from_env() {
        Ok(config) if config.auth_token.is_some() => config,
        Ok(_) => {
            eprintln!("❌ Error: X_AUTH_TOKEN environment variable is not set.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };
    let client = TwitterClient::new(config)?;

    // Optional reply target
    print!("↩️  Reply to tweet id (leave empty for none): ");
    io::stdout().flush()?;
    let mut reply_to = String::new();
    io::stdin().read_line(&mut reply_to)?;
    let reply_to = reply_to.trim();
    let reply_to = (!reply_to.is_empty()).then_some(reply_to);

    println!("✍️  Enter the tweet text, finish with Ctrl-D:");
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    let text = text.trim();

    if text.is_empty() {
        eprintln!("❌ Error: Tweet text cannot be empty");
        std::process::exit(1);
    }

    let (plain, tags) = parse_markdown_to_richtext(text);
    println!(
        "📏 Plain text length: {} characters, {} formatted ranges",
        plain.chars().count(),
        tags.len()
    );

    println!("\n🚀 Posting your note tweet...");
    match client.create_note_tweet(text, true, reply_to).await {
        Ok(Some(id)) => println!("🎉 Posted tweet {}", id),
        Ok(None) => println!("⚠️  The proxy accepted the post but returned no tweet id"),
        Err(e) => {
            eprintln!("💥 Failed to post note tweet: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
