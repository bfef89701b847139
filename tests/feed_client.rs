// HTTP transport tests against a local wiremock server.

use std::time::Duration;

use ghostpost::error::FetchError;
use ghostpost::feed::client::{base_feed_url, cursor_feed_url};
use ghostpost::feed::{fetch_pages, FeedTransport, HttpFeedClient, PostExtractor};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE_ONE: &str = "<span>@</span>alice\n\
<div class=\"tweet-text\" data-id=\"20\">\n\
<div class=\"dir-ltr\" dir=\"ltr\">  newest</div>\n\
<a href=\"/alice?max_id=19\">Load older Tweets</a>\n";

const PAGE_TWO: &str = "<span>@</span>alice\n\
<div class=\"tweet-text\" data-id=\"19\">\n\
<div class=\"dir-ltr\" dir=\"ltr\">  older</div>\n";

fn client() -> HttpFeedClient {
    HttpFeedClient::new(Duration::from_secs(5)).expect("client builds")
}

#[tokio::test]
async fn fetch_returns_body_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_ONE))
        .mount(&server)
        .await;

    let body = client()
        .fetch(&base_feed_url(&server.uri(), "alice"))
        .await
        .expect("fetch ok");
    assert_eq!(body, PAGE_ONE.as_bytes());
}

#[tokio::test]
async fn non_success_status_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alice"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client()
        .fetch(&base_feed_url(&server.uri(), "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn unreachable_host_is_a_request_error() {
    // Port 9 (discard) on localhost is not listening in test environments
    let err = client()
        .fetch("http://127.0.0.1:9/alice")
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }));
}

#[tokio::test]
async fn paginates_over_http_with_cursor_param() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alice"))
        .and(query_param("max_id", "19"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_TWO))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_ONE))
        .expect(1)
        .mount(&server)
        .await;

    let feed = fetch_pages(
        &client(),
        &PostExtractor::default(),
        &server.uri(),
        "alice",
        5,
    )
    .await
    .expect("pagination ok");

    let ids: Vec<i64> = feed.posts.iter().map(|p| p.post_id).collect();
    assert_eq!(ids, vec![20, 19]);
    assert_eq!(feed.pages_fetched, 2);
    assert!(feed.reached_end);
    assert_eq!(
        cursor_feed_url(&server.uri(), "alice", "19"),
        format!("{}/alice?max_id=19", server.uri())
    );
}
