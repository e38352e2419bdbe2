//! Fetcher retries and listing page loading against a mock site

use crate::common::{fetcher, listing_html, COOKIE};
use shiori::crawler::{Fetched, LinkSource, ListingSource};
use shiori::{FetchError, ShioriError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(5)
        .fetch_text(&format!("{}/gone/", server.uri()))
        .await
        .unwrap();

    assert!(matches!(result, Fetched::NotFound));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(3)
        .fetch_text(&format!("{}/flaky/", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.found().as_deref(), Some("finally"));
}

#[tokio::test]
async fn test_exhausted_retries_return_the_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let err = fetcher(3)
        .fetch_text(&format!("{}/broken/", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_pages_carry_the_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private/"))
        .and(header("cookie", COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(0)
        .fetch_text(&format!("{}/private/", server.uri()))
        .await
        .unwrap();

    assert!(result.is_found());
}

#[tokio::test]
async fn test_listing_source_loads_names() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/list/all/2/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing_html(&base, &["last-one"], "2")),
        )
        .mount(&server)
        .await;

    let source = ListingSource::new(fetcher(0), &base, "/list/all/", 2);
    assert_eq!(source.page_url(2), format!("{}/list/all/2/", base));

    let page = source.load_page(2).await.unwrap();
    assert_eq!(page.names, vec!["last-one"]);
    assert!(page.last);
}

#[tokio::test]
async fn test_truncated_listing_page_is_retried_then_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/list/all/1/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing_html(&base, &["lonely"], "3")),
        )
        .expect(3)
        .mount(&server)
        .await;

    let source = ListingSource::new(fetcher(2), &base, "list/all", 2);
    let err = source.load_page(1).await.unwrap_err();

    assert!(matches!(
        err,
        ShioriError::IncompletePage {
            page: 1,
            found: 1,
            expected: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn test_missing_listing_page_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let source = ListingSource::new(fetcher(3), &server.uri(), "list/all", 2);
    let err = source.load_page(1).await.unwrap_err();

    assert!(matches!(err, ShioriError::ListingNotFound { .. }));
}

#[tokio::test]
async fn test_listing_without_pagination_is_malformed() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing_html(&base, &["a", "b"], "")),
        )
        .mount(&server)
        .await;

    let source = ListingSource::new(fetcher(0), &base, "list/all", 2);
    let err = source.load_page(1).await.unwrap_err();

    assert!(matches!(err, ShioriError::Listing { .. }));
}
