//! Bounded fetch of allow-listed reference pages
//!
//! Every failure is logged and downgraded to empty text: callers treat an
//! empty string as "no supplementary content", never as an error.

use super::html::{extract_text, truncate_to_cap};
use super::SourceCatalog;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Hard upper bound on how long a page fetch may take
pub const MAX_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Bytes of a response body read before the rest is dropped
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Raw HTTP response as seen by the fetcher
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[cfg(test)]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure (no HTTP status available)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Other(String),
}

/// Minimal HTTP GET client
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpFetcher + ?Sized> HttpFetcher for Arc<T> {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        (**self).get(url, headers, timeout).await
    }
}

/// Production fetcher backed by `reqwest`
#[derive(Clone, Default)]
pub struct ReqwestFetcher {
    client: Client,
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Other(e.to_string())
            }
        };

        let mut response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();

        let mut raw: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            let room = MAX_BODY_BYTES - raw.len();
            if chunk.len() >= room {
                raw.extend_from_slice(chunk.get(..room).unwrap_or_default());
                tracing::debug!(url = %url, limit = MAX_BODY_BYTES, "Response body truncated");
                break;
            }
            raw.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&raw).into_owned();
        Ok(HttpResponse { status, body })
    }
}

/// Why a fetch produced no content. Only ever logged.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("url is not in the source catalog")]
    Disallowed,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("page contained no visible text")]
    EmptyBody,
}

/// Fetch parameters
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Maximum length of the returned text, in characters
    pub max_chars: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_chars: 3000,
            timeout: MAX_FETCH_TIMEOUT,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// Fetches catalog pages and reduces them to capped plain text
pub struct ContentFetcher<H: HttpFetcher> {
    http: H,
    catalog: SourceCatalog,
    settings: FetchSettings,
}

impl<H: HttpFetcher> ContentFetcher<H> {
    pub fn new(http: H, catalog: SourceCatalog, settings: FetchSettings) -> Self {
        let settings = FetchSettings {
            timeout: settings.timeout.min(MAX_FETCH_TIMEOUT),
            ..settings
        };
        Self {
            http,
            catalog,
            settings,
        }
    }

    /// Fetch `url` and return its visible text, or empty text on any failure.
    ///
    /// URLs outside the catalog are refused without any network I/O.
    pub async fn fetch(&self, url: &str) -> String {
        match self.try_fetch(url).await {
            Ok(text) => {
                tracing::debug!(url = %url, chars = text.chars().count(), "Fetched source content");
                text
            }
            Err(FetchError::Disallowed) => {
                tracing::warn!(url = %url, "Refusing to fetch url outside the source catalog");
                String::new()
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Source fetch failed, continuing without content");
                String::new()
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        if !self.catalog.contains_url(url) {
            return Err(FetchError::Disallowed);
        }

        let headers = [("User-Agent", self.settings.user_agent.as_str())];
        let response = self.http.get(url, &headers, self.settings.timeout).await?;
        if !response.is_success() {
            return Err(FetchError::Status(response.status));
        }

        let text = extract_text(&response.body);
        if text.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(truncate_to_cap(text, self.settings.max_chars))
    }
}
