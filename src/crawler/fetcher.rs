//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the HTTP client
//! - Attaching the session cookie to page requests
//! - Telling "resource absent" (HTTP 404) apart from transient failures
//! - Retrying transient failures with exponential backoff
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Return the body |
//! | HTTP 404 | Immediate → `Fetched::NotFound`, never retried |
//! | Other status | Retry with backoff |
//! | Network error / timeout / body read error | Retry with backoff |

use crate::config::Config;
use crate::crawler::retry::{retry, RetryPolicy};
use crate::FetchError;
use reqwest::multipart::Form;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// Outcome of a fetch that reached the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    /// The resource exists
    Found(T),

    /// The server answered 404
    NotFound,
}

impl<T> Fetched<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Fetched::Found(value) => Some(value),
            Fetched::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Fetched::Found(_))
    }
}

/// Builds an HTTP client with the given transport timeout
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrying GET client shared by listing, detail and cover requests
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    cookie: Option<String>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: Client, cookie: impl Into<String>, policy: RetryPolicy) -> Self {
        let cookie = cookie.into();
        Self {
            client,
            cookie: (!cookie.is_empty()).then_some(cookie),
            policy,
        }
    }

    /// Builds a fetcher from the site and crawler sections of the configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(Duration::from_secs(config.crawler.timeout_secs))?;
        Ok(Self::new(
            client,
            config.site.cookie.clone(),
            RetryPolicy::from_config(&config.crawler),
        ))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches a markup page, retrying transient failures
    pub async fn fetch_text(&self, url: &str) -> Result<Fetched<String>, FetchError> {
        retry(&self.policy, url, || self.try_text(url)).await
    }

    /// Fetches a binary asset, retrying transient failures
    ///
    /// Assets usually live on another host, so the session cookie is not sent.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Fetched<Vec<u8>>, FetchError> {
        retry(&self.policy, url, || self.try_bytes(url)).await
    }

    /// Single attempt at fetching a markup page
    pub async fn try_text(&self, url: &str) -> Result<Fetched<String>, FetchError> {
        let response = match self.send(self.authenticated(self.client.get(url)), url).await? {
            Fetched::Found(response) => response,
            Fetched::NotFound => return Ok(Fetched::NotFound),
        };

        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(Fetched::Found(body))
    }

    /// Single attempt at fetching a binary asset
    pub async fn try_bytes(&self, url: &str) -> Result<Fetched<Vec<u8>>, FetchError> {
        let response = match self.send(self.client.get(url), url).await? {
            Fetched::Found(response) => response,
            Fetched::NotFound => return Ok(Fetched::NotFound),
        };

        let bytes = response.bytes().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(Fetched::Found(bytes.to_vec()))
    }

    /// Posts a multipart form with the session cookie, without retrying
    pub async fn post_form(&self, url: &str, form: Form) -> Result<Response, FetchError> {
        let request = self.authenticated(self.client.post(url)).multipart(form);
        match self.send(request, url).await? {
            Fetched::Found(response) => Ok(response),
            Fetched::NotFound => Err(FetchError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            }),
        }
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.cookie {
            Some(cookie) => request.header(header::COOKIE, cookie),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Fetched<Response>, FetchError> {
        let response = request.send().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("{} answered 404", url);
            return Ok(Fetched::NotFound);
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Fetched::Found(response))
    }
}
