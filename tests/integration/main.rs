//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the
//! fetcher, the listing source, the extractor and full runs end to end.

mod common;
mod extraction_tests;
mod fetch_tests;
mod run_tests;
