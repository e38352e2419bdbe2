//! Sync and label runs end to end: mock site, SQLite catalog, cover directory

use crate::common::{detail_html, fetcher, listing_html, record, write_config};
use chrono::{DateTime, Duration, TimeZone, Utc};
use shiori::catalog::FsCoverCache;
use shiori::config::Config;
use shiori::crawler::{Coordinator, SyncOptions, UpdatePolicy};
use shiori::storage::{CatalogStore, SqliteStore};
use shiori::ShioriError;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"
[[listing]]
path = "list/latest"
"#;

async fn mount_listing(server: &MockServer, listing: &str, page: u32, names: &[&str], total: &str, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/{}/", listing, page)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing_html(&server.uri(), names, total)),
        )
        .expect(hits)
        .mount(server)
        .await;
}

async fn mount_item(server: &MockServer, name: &str, id: u64, hits: u64) {
    let cover_url = format!("{}/covers/{}.jpg", server.uri(), id);
    Mock::given(method("GET"))
        .and(path(format!("/{}/", name)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(id, &cover_url)))
        .expect(hits)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/covers/{}.jpg", id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(format!("cover {}", id).into_bytes()))
        .mount(server)
        .await;
}

async fn open(config: Config) -> Coordinator<SqliteStore> {
    let store = SqliteStore::new(Path::new(&config.output.database_path)).unwrap();
    let covers = FsCoverCache::open(&config.output.covers_dir).await.unwrap();
    Coordinator::with_parts(config, "test-hash", fetcher(1), store, Arc::new(covers)).unwrap()
}

fn reopen_store(config: &Config) -> SqliteStore {
    SqliteStore::new(Path::new(&config.output.database_path)).unwrap()
}

#[tokio::test]
async fn test_sync_fills_an_empty_catalog() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri(), LISTING);

    mount_listing(&server, "list/latest", 1, &["a", "b"], "2", 1).await;
    mount_listing(&server, "list/latest", 2, &["c"], "2", 1).await;
    mount_item(&server, "a", 1, 1).await;
    mount_item(&server, "b", 2, 1).await;
    mount_item(&server, "c", 3, 1).await;

    let mut coordinator = open(config.clone()).await;
    let report = coordinator.sync(SyncOptions::default()).await.unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.processed, 3);
    assert_eq!(report.stopped_early, 0);
    assert_eq!(report.saved, 3);

    let catalog = reopen_store(&config).load_catalog().unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.get("c").unwrap().id, 3);
    assert!(catalog.records().all(|r| r.cover));
    assert!(dir.path().join("covers").join("2").exists());
}

#[tokio::test]
async fn test_sync_stops_on_a_page_of_known_items() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri(), LISTING);

    reopen_store(&config)
        .save_records(&[record("a", 1), record("b", 2)])
        .unwrap();

    mount_listing(&server, "list/latest", 1, &["a", "b"], "2", 1).await;
    mount_listing(&server, "list/latest", 2, &["c"], "2", 0).await;
    mount_item(&server, "a", 1, 0).await;
    mount_item(&server, "b", 2, 0).await;
    mount_item(&server, "c", 3, 0).await;

    let mut coordinator = open(config.clone()).await;
    let report = coordinator.sync(SyncOptions::default()).await.unwrap();

    assert_eq!(report.pages, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.stopped_early, 1);
    assert!(!coordinator.catalog().contains("c"));
}

#[tokio::test]
async fn test_forced_sync_refreshes_records_and_keeps_labels() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri(), LISTING);

    let mut labelled = record("a", 1);
    labelled.label = Some(true);
    reopen_store(&config)
        .save_records(&[labelled, record("b", 2)])
        .unwrap();

    mount_listing(&server, "list/latest", 1, &["a", "b"], "1", 1).await;
    mount_item(&server, "a", 1, 1).await;
    mount_item(&server, "b", 2, 1).await;

    let mut coordinator = open(config.clone()).await;
    let options = SyncOptions {
        policy: UpdatePolicy::force_all(),
        start_page: 1,
    };
    let report = coordinator.sync(options).await.unwrap();
    assert_eq!(report.processed, 2);

    let catalog = reopen_store(&config).load_catalog().unwrap();
    let a = catalog.get("a").unwrap();
    assert_eq!(a.label, Some(true));
    assert_eq!(a.authors, vec!["some author"]);
    assert_eq!(catalog.get("b").unwrap().label, None);
}

#[tokio::test]
async fn test_stale_sync_refreshes_old_records_and_stops_on_fresh_pages() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri(), LISTING);
    let cutoff = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let uploaded = |name: &str, id: u64, at: Option<DateTime<Utc>>| {
        let mut item = record(name, id);
        item.uploaded = at;
        item
    };
    let mut undated = uploaded("a", 1, None);
    undated.label = Some(false);
    reopen_store(&config)
        .save_records(&[
            undated,
            uploaded("b", 2, Some(cutoff)),
            uploaded("c", 3, Some(cutoff + Duration::days(3))),
            uploaded("d", 4, Some(cutoff + Duration::days(7))),
        ])
        .unwrap();

    mount_listing(&server, "list/latest", 1, &["a", "b"], "3", 1).await;
    mount_listing(&server, "list/latest", 2, &["c", "d"], "3", 1).await;
    mount_listing(&server, "list/latest", 3, &["e"], "3", 0).await;
    mount_item(&server, "a", 1, 1).await;
    mount_item(&server, "b", 2, 0).await;
    mount_item(&server, "c", 3, 0).await;
    mount_item(&server, "d", 4, 0).await;
    mount_item(&server, "e", 5, 0).await;

    let mut coordinator = open(config.clone()).await;
    let options = SyncOptions {
        policy: UpdatePolicy::stale_before(cutoff),
        start_page: 1,
    };
    let report = coordinator.sync(options).await.unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.stopped_early, 1);

    let catalog = reopen_store(&config).load_catalog().unwrap();
    let a = catalog.get("a").unwrap();
    assert_eq!(a.authors, vec!["some author"]);
    assert_eq!(a.label, Some(false));
    assert!(a.uploaded.is_some());
    assert_eq!(catalog.get("b").unwrap().authors, vec!["old author"]);
    assert!(!catalog.contains("e"));
}

#[tokio::test]
async fn test_failed_sync_keeps_checkpointed_pages() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri(), LISTING);

    mount_listing(&server, "list/latest", 1, &["a", "b"], "3", 1).await;
    mount_listing(&server, "list/latest", 2, &["c"], "3", 2).await;
    mount_item(&server, "a", 1, 1).await;
    mount_item(&server, "b", 2, 1).await;

    let mut coordinator = open(config.clone()).await;
    let err = coordinator.sync(SyncOptions::default()).await.unwrap_err();
    assert!(matches!(err, ShioriError::IncompletePage { page: 2, .. }));

    let store = reopen_store(&config);
    assert_eq!(store.count_items().unwrap(), 2);
    assert_eq!(
        store.get_run(1).unwrap().status,
        shiori::storage::RunStatus::Failed
    );
}

#[tokio::test]
async fn test_label_run_labels_both_listings() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let extra = r#"
[labels]
positive = ["user/favorites/1"]
negative = ["user/favorites/2"]

[favorites]
probe-id = 38385
"#;
    let config = write_config(dir.path(), &server.uri(), extra);

    let mut known = record("liked", 1);
    known.label = Some(true);
    reopen_store(&config)
        .save_records(&[known, record("disliked", 2)])
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_string_contains("bookmark"))
        .and(body_string_contains("38385"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, "user/favorites/1", 1, &["liked", "new-one"], "1", 1).await;
    mount_listing(&server, "user/favorites/2", 1, &["disliked"], "1", 1).await;
    mount_item(&server, "liked", 1, 0).await;
    mount_item(&server, "new-one", 3, 1).await;
    mount_item(&server, "disliked", 2, 0).await;

    let mut coordinator = open(config.clone()).await;
    let report = coordinator.label(false).await.unwrap();

    assert_eq!(report.listings, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.processed, 2);

    let store = reopen_store(&config);
    let catalog = store.load_catalog().unwrap();
    assert_eq!(catalog.get("liked").unwrap().label, Some(true));
    assert_eq!(catalog.get("new-one").unwrap().label, Some(true));
    assert_eq!(catalog.get("disliked").unwrap().label, Some(false));
    assert_eq!(store.count_labelled().unwrap(), 3);
}

#[tokio::test]
async fn test_label_run_fails_when_favorites_are_refused() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let extra = r#"
[labels]
positive = ["user/favorites/1"]

[favorites]
probe-id = 1
"#;
    let config = write_config(dir.path(), &server.uri(), extra);

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": 0 })))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, "user/favorites/1", 1, &["liked"], "1", 0).await;

    let mut coordinator = open(config).await;
    let err = coordinator.label(false).await.unwrap_err();

    assert!(matches!(err, ShioriError::Api(_)));
}
