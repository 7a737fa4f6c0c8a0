//! Pagination driver against a mock proxy serving pages by cursor.

use std::collections::HashMap;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use super::{
    cursor_entry, follow_page, instructions, request_variables, test_client, tweet_entry,
    user_tweets_page,
};
use crate::twitter::{PageLimit, SearchProduct, PAGE_SIZE};

/// Serves the page registered for the request's `cursor` variable; the first
/// page is registered under the empty cursor.
struct CursorPages {
    pages: HashMap<String, Value>,
}

impl CursorPages {
    fn new(pages: Vec<(&str, Value)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(cursor, page)| (cursor.to_string(), page))
                .collect(),
        }
    }
}

impl Respond for CursorPages {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let variables = request_variables(request);
        let cursor = variables["cursor"].as_str().unwrap_or_default();
        match self.pages.get(cursor) {
            Some(page) => ResponseTemplate::new(200).set_body_json(page),
            None => ResponseTemplate::new(200).set_body_json(json!({ "data": {} })),
        }
    }
}

fn ids(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| i.to_string()).collect()
}

fn refs(ids: &[String]) -> Vec<&str> {
    ids.iter().map(String::as_str).collect()
}

async fn mount_pages(server: &MockServer, operation: &str, pages: Vec<(&str, Value)>) {
    Mock::given(method("GET"))
        .and(path(format!("/graphql/{}", operation)))
        .respond_with(CursorPages::new(pages))
        .mount(server)
        .await;
}

/// Exactly the requested number of tweets, spanning two pages.
#[tokio::test]
async fn test_collects_exact_count_across_pages() {
    let server = MockServer::start().await;
    let first = ids(0..20);
    let second = ids(20..40);
    mount_pages(
        &server,
        "UserTweets",
        vec![
            ("", user_tweets_page(&refs(&first), Some("c1"))),
            ("c1", user_tweets_page(&refs(&second), Some("c2"))),
        ],
    )
    .await;

    let client = test_client(&server, 2);
    let tweets = client.get_user_tweets("42", PageLimit::Count(25)).await.unwrap();
    assert_eq!(tweets.len(), 25);
    let got: Vec<&str> = tweets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(got, refs(&ids(0..25)));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let first_vars = request_variables(&requests[0]);
    assert_eq!(first_vars["count"], PAGE_SIZE);
    assert_eq!(first_vars["userId"], "42");
    assert!(first_vars.get("cursor").is_none());
    assert_eq!(request_variables(&requests[1])["cursor"], "c1");
}

/// Duplicates across pages are dropped; the first occurrence wins.
#[tokio::test]
async fn test_deduplicates_across_pages() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        "UserTweets",
        vec![
            ("", user_tweets_page(&["1", "2", "3"], Some("c1"))),
            ("c1", user_tweets_page(&["3", "4", "1"], Some("c2"))),
            ("c2", user_tweets_page(&["5"], None)),
        ],
    )
    .await;

    let client = test_client(&server, 2);
    let tweets = client.get_user_tweets("42", PageLimit::All).await.unwrap();
    let got: Vec<&str> = tweets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(got, vec!["1", "2", "3", "4", "5"]);
}

/// A page that adds nothing new ends the walk even with a cursor.
#[tokio::test]
async fn test_stops_when_page_adds_nothing() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        "UserTweets",
        vec![
            ("", user_tweets_page(&["1", "2"], Some("c1"))),
            ("c1", user_tweets_page(&["2"], Some("c2"))),
            ("c2", user_tweets_page(&["3"], Some("c3"))),
        ],
    )
    .await;

    let client = test_client(&server, 2);
    let tweets = client.get_user_tweets("42", PageLimit::All).await.unwrap();
    assert_eq!(tweets.len(), 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

/// No bottom cursor means no further page.
#[tokio::test]
async fn test_stops_without_cursor() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        "UserTweets",
        vec![("", user_tweets_page(&["1", "2", "3"], None))],
    )
    .await;

    let client = test_client(&server, 2);
    let tweets = client.get_user_tweets("42", PageLimit::Count(100)).await.unwrap();
    assert_eq!(tweets.len(), 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// An empty timeline is an empty list, not an error.
#[tokio::test]
async fn test_empty_timeline() {
    let server = MockServer::start().await;
    mount_pages(&server, "UserTweets", vec![("", user_tweets_page(&[], Some("c1")))]).await;

    let client = test_client(&server, 2);
    let tweets = client.get_user_tweets("42", PageLimit::All).await.unwrap();
    assert!(tweets.is_empty());
}

/// A zero limit makes no request at all.
#[tokio::test]
async fn test_zero_limit_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_tweets_page(&["1"], None)))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server, 2);
    let tweets = client
        .get_user_tweets("42", PageLimit::from_desired(0))
        .await
        .unwrap();
    assert!(tweets.is_empty());
}

/// Negative desired counts mean everything; the default is one page.
#[test]
fn test_page_limit_from_desired() {
    assert_eq!(PageLimit::from_desired(-1), PageLimit::All);
    assert_eq!(PageLimit::from_desired(-20), PageLimit::All);
    assert_eq!(PageLimit::from_desired(7), PageLimit::Count(7));
    assert_eq!(PageLimit::default(), PageLimit::Count(PAGE_SIZE));
}

/// The pinned tweet is collected alongside the regular entries.
#[tokio::test]
async fn test_pinned_tweet_is_included() {
    let server = MockServer::start().await;
    let mut page = user_tweets_page(&["2", "3"], None);
    page["data"]["user"]["result"]["timeline_v2"]["timeline"]["instructions"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "type": "TimelinePinEntry", "entry": tweet_entry("1") }));
    mount_pages(&server, "UserTweets", vec![("", page)]).await;

    let client = test_client(&server, 2);
    let tweets = client.get_user_tweets("42", PageLimit::All).await.unwrap();
    let got: Vec<&str> = tweets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(got, vec!["2", "3", "1"]);
}

/// Followers are users, paged the same way.
#[tokio::test]
async fn test_followers_pages() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        "Followers",
        vec![
            ("", follow_page(&["10", "11"], Some("f1"))),
            ("f1", follow_page(&["12"], Some("f2"))),
            ("f2", follow_page(&[], Some("f3"))),
        ],
    )
    .await;

    let client = test_client(&server, 2);
    let users = client.get_followers("42", PageLimit::All).await.unwrap();
    let got: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(got, vec!["10", "11", "12"]);
    assert_eq!(users[2].username, "user12");
}

/// Following and followers-you-know use their own operations.
#[tokio::test]
async fn test_following_and_followers_you_know() {
    let server = MockServer::start().await;
    mount_pages(&server, "Following", vec![("", follow_page(&["20"], None))]).await;
    mount_pages(&server, "FollowersYouKnow", vec![("", follow_page(&["30", "31"], None))]).await;

    let client = test_client(&server, 2);
    let following = client.get_following("42", PageLimit::All).await.unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].id, "20");

    let known = client
        .get_followers_you_know("42", PageLimit::Count(1))
        .await
        .unwrap();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].id, "30");
}

fn search_page(ids: &[&str], bottom: &str, replaced: bool) -> Value {
    let entries: Vec<Value> = ids.iter().map(|id| tweet_entry(id)).collect();
    let mut steps = instructions(entries, (!replaced).then_some(bottom));
    if replaced {
        steps.as_array_mut().unwrap().push(json!({
            "type": "TimelineReplaceEntry",
            "entry_id_to_replace": "cursor-bottom-0",
            "entry": cursor_entry("Bottom", bottom),
        }));
    }
    json!({
        "data": { "search_by_raw_query": { "search_timeline": { "timeline": {
            "instructions": steps
        } } } }
    })
}

/// Later search pages move the bottom cursor into a replace instruction.
#[tokio::test]
async fn test_search_follows_replaced_cursor() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        "SearchTimeline",
        vec![
            ("", search_page(&["1", "2"], "s1", false)),
            ("s1", search_page(&["3"], "s2", true)),
            ("s2", search_page(&["4"], "s3", true)),
        ],
    )
    .await;

    let client = test_client(&server, 2);
    let tweets = client
        .search_timeline("rust lang", SearchProduct::Top, PageLimit::Count(4))
        .await
        .unwrap();
    assert_eq!(tweets.len(), 4);

    let requests = server.received_requests().await.unwrap();
    let first_vars = request_variables(&requests[0]);
    assert_eq!(first_vars["rawQuery"], "rust lang");
    assert_eq!(first_vars["product"], "Top");
    assert_eq!(first_vars["querySource"], "typed_query");
    assert_eq!(request_variables(&requests[2])["cursor"], "s2");
}

/// List timelines read from their own path.
#[tokio::test]
async fn test_list_latest_tweets() {
    let server = MockServer::start().await;
    let entries: Vec<Value> = ["7", "8"].iter().map(|id| tweet_entry(id)).collect();
    let page = json!({
        "data": { "list": { "tweets_timeline": { "timeline": {
            "instructions": instructions(entries, None)
        } } } }
    });
    mount_pages(&server, "ListLatestTweetsTimeline", vec![("", page)]).await;

    let client = test_client(&server, 2);
    let tweets = client
        .get_list_latest_tweets("1234", PageLimit::default())
        .await
        .unwrap();
    let got: Vec<&str> = tweets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(got, vec!["7", "8"]);
}

/// The screen name is resolved before the timeline is read.
#[tokio::test]
async fn test_user_tweets_by_screen_name() {
    let server = MockServer::start().await;
    Mock::given(path("/graphql/UserByScreenName"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "user": { "result": super::user_result("77", "someone") } }
        })))
        .mount(&server)
        .await;
    mount_pages(&server, "UserTweets", vec![("", user_tweets_page(&["1"], None))]).await;

    let client = test_client(&server, 2);
    let tweets = client
        .get_user_tweets_by_screen_name("someone", PageLimit::All)
        .await
        .unwrap();
    assert_eq!(tweets.len(), 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(request_variables(&requests[1])["userId"], "77");
}
