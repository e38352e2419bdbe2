//! Shared fixtures: site markup, configuration files and records

use shiori::config::{load_config, Config};
use shiori::crawler::{build_http_client, Fetcher, RetryPolicy};
use shiori::ItemRecord;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const COOKIE: &str = "session=abc";

/// Fetcher with the test session cookie and `retries` immediate retries
pub fn fetcher(retries: u32) -> Arc<Fetcher> {
    let client = build_http_client(Duration::from_secs(5)).expect("client builds");
    Arc::new(Fetcher::new(client, COOKIE, RetryPolicy::immediate(retries)))
}

/// A listing page in the site's markup; `total` empty leaves out the pagination
pub fn listing_html(base: &str, names: &[&str], total: &str) -> String {
    let items: String = names
        .iter()
        .map(|name| {
            format!(
                r#"<div class="overlay-button"><a class="btn" href="{base}/{name}/read/">Read</a><a class="btn" href="{base}/{name}/">Info</a></div>"#
            )
        })
        .collect();

    let pagination = if total.is_empty() {
        String::new()
    } else {
        format!(r#"<ul class="pagination"><li>1</li><li>{total}</li><li></li></ul>"#)
    };

    format!("<html><body>{items}{pagination}</body></html>")
}

/// A complete detail page for item `id` with its cover at `cover_url`
pub fn detail_html(id: u64, cover_url: &str) -> String {
    format!(
        r#"<html><body>
  <img class="img-responsive" data-src="//lazy/{cover_url}">
  <ul class="list list-simple-mini">
    <li class="text-primary"><b>Author:</b> <a href="/a/1">Some Author</a></li>
    <li class="text-primary"><b>Category</b> <a href="/c/1">Manga</a></li>
    <li class="text-primary"><b>Content</b> <a href="/t/1">Comedy</a><a href="/t/2">Drama</a></li>
    <li class="text-primary"><b>Page</b> <a href="/p">32 pages</a></li>
    <li class="text-primary"><b>View</b> <a href="/v">1,{id:03} views</a></li>
    <li class="text-primary"><b>Release Year</b> <a href="/y">2020</a></li>
  </ul>
  <div class="rating"><div class="js-raty"></div><span>Score 3.5/5 with 12 votes</span></div>
  <button class="js-addBookmark" data-mid="{id}">Bookmark</button>
  <ul class="nav-chapters">
    <li><a href="/c1">Chapter 1</a> <span class="text-muted">Uploaded by someone about 2 days ago</span></li>
  </ul>
</body></html>"#
    )
}

/// Writes a configuration file into `dir` and loads it back
///
/// `extra` is appended verbatim, for `[[listing]]`, `[labels]` or `[favorites]`.
pub fn write_config(dir: &Path, base: &str, extra: &str) -> Config {
    let config_path = dir.join("shiori.toml");
    let database = dir.join("catalog.db");
    let covers = dir.join("covers");

    let contents = format!(
        r#"
[site]
url = "{base}"
cookie = "{COOKIE}"

[crawler]
page-size = 2
batch-size = 2
max-retries = 1
backoff-base = 1.0

[output]
database-path = "{}"
covers-dir = "{}"

{extra}
"#,
        database.display(),
        covers.display()
    );
    std::fs::write(&config_path, contents).expect("config is written");
    load_config(&config_path).expect("config loads")
}

pub fn record(name: &str, id: u64) -> ItemRecord {
    ItemRecord {
        id,
        name: name.to_string(),
        cover: false,
        views: 1,
        pages: 1,
        chapters: 1,
        year: None,
        authors: vec!["old author".to_string()],
        categories: vec![],
        tags: vec![],
        score: 0.0,
        votes: 0,
        uploaded: None,
        label: None,
    }
}
