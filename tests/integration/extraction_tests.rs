//! Detail page extraction and cover caching against a mock site

use crate::common::{detail_html, fetcher};
use shiori::catalog::{CoverCache, MemoryCoverCache};
use shiori::crawler::{BookExtractor, Fetched};
use shiori::ShioriError;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_detail(server: &MockServer, name: &str, id: u64) {
    let cover_url = format!("{}/covers/{}.jpg", server.uri(), id);
    Mock::given(method("GET"))
        .and(path(format!("/{}/", name)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(id, &cover_url)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_extracts_a_complete_record() {
    let server = MockServer::start().await;
    mount_detail(&server, "a-book", 7).await;
    Mock::given(method("GET"))
        .and(path("/covers/7.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let covers = Arc::new(MemoryCoverCache::new());
    let extractor = BookExtractor::new(fetcher(0), covers.clone(), &server.uri());

    let record = extractor.extract("a-book").await.unwrap().found().unwrap();

    assert_eq!(record.name, "a-book");
    assert_eq!(record.id, 7);
    assert!(record.cover);
    assert_eq!(record.views, 1007);
    assert_eq!(record.pages, 32);
    assert_eq!(record.chapters, 1);
    assert_eq!(record.year, Some(2020));
    assert_eq!(record.authors, vec!["some author"]);
    assert_eq!(record.tags, vec!["comedy", "drama"]);
    assert_eq!(record.score, 3.5);
    assert_eq!(record.votes, 12);
    assert!(record.uploaded.is_some());
    assert_eq!(record.label, None);

    assert_eq!(covers.load(7).await.unwrap().as_deref(), Some(&b"jpeg bytes"[..]));
}

#[tokio::test]
async fn test_cached_cover_is_not_downloaded_again() {
    let server = MockServer::start().await;
    mount_detail(&server, "a-book", 7).await;
    Mock::given(method("GET"))
        .and(path("/covers/7.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let covers = Arc::new(MemoryCoverCache::new());
    let extractor = BookExtractor::new(fetcher(0), covers.clone(), &server.uri());

    let first = extractor.extract("a-book").await.unwrap().found().unwrap();
    let second = extractor.extract("a-book").await.unwrap().found().unwrap();

    assert!(first.cover);
    assert!(second.cover);
    assert_eq!(covers.len(), 1);
}

#[tokio::test]
async fn test_missing_cover_leaves_the_flag_unset() {
    let server = MockServer::start().await;
    mount_detail(&server, "a-book", 7).await;
    Mock::given(method("GET"))
        .and(path("/covers/7.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let covers = Arc::new(MemoryCoverCache::new());
    let extractor = BookExtractor::new(fetcher(3), covers.clone(), &server.uri());

    let record = extractor.extract("a-book").await.unwrap().found().unwrap();

    assert!(!record.cover);
    assert!(covers.is_empty());
}

#[tokio::test]
async fn test_malformed_page_fails_before_the_cover_is_fetched() {
    let server = MockServer::start().await;
    let html = detail_html(7, &format!("{}/covers/7.jpg", server.uri()))
        .replace("1,007 views", "lots of views");
    Mock::given(method("GET"))
        .and(path("/a-book/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/covers/7.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let extractor = BookExtractor::new(fetcher(3), Arc::new(MemoryCoverCache::new()), &server.uri());
    let err = extractor.extract("a-book").await.unwrap_err();

    match err {
        ShioriError::Extraction(e) => assert!(e.url.ends_with("/a-book/")),
        other => panic!("expected an extraction error, got {}", other),
    }
}

#[tokio::test]
async fn test_vanished_item_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let extractor = BookExtractor::new(fetcher(3), Arc::new(MemoryCoverCache::new()), &server.uri());
    let result = extractor.extract("gone").await.unwrap();

    assert_eq!(result, Fetched::NotFound);
}
