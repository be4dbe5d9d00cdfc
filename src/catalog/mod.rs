//! Movie catalog HTTP client (TMDB-compatible API)
//!
//! Two stateless request/response entry points, no retry:
//! - `GET {base}/movie/popular?api_key=...`
//! - `GET {base}/search/movie?api_key=...&query=...`
//!
//! Both return `{ "results": [Movie, ...] }`. A payload without a usable
//! `results` array is a typed [`CatalogError::MalformedPayload`], never an
//! unchecked field access.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Catalog operation errors with typed variants
///
/// Enables callers to distinguish between failure modes without string
/// matching:
/// - `Http` - non-success status from the catalog
/// - `MalformedPayload` - response body did not have the expected shape
/// - `Timeout` - the request exceeded the client timeout
/// - `Network` - connection failed before a response arrived
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Non-success HTTP status from the catalog API
    #[error("Catalog HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body was not the expected `{ results: [...] }` shape
    #[error("Malformed catalog payload: {0}")]
    MalformedPayload(String),

    /// Request exceeded the configured timeout
    #[error("Catalog request timed out: {0}")]
    Timeout(String),

    /// Connection-level failure (DNS, refused, reset)
    #[error("Catalog network error: {0}")]
    Network(String),
}

impl CatalogError {
    /// Convert reqwest transport errors into typed CatalogError
    fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CatalogError::Timeout(e.to_string())
        } else if e.is_decode() {
            CatalogError::MalformedPayload(e.to_string())
        } else {
            CatalogError::Network(e.to_string())
        }
    }
}

/// A movie as supplied by the catalog.
///
/// Only `id` is interpreted by this crate; everything else is pass-through
/// display payload. Unknown catalog fields are preserved in `extra` so a
/// persisted favorite round-trips what the catalog sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Movie {
    /// Release year, if the catalog supplied a `YYYY-MM-DD` date.
    pub fn release_year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogPage {
    results: Vec<Movie>,
}

/// Client for the movie catalog API
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Fetch the current popular-movies list.
    pub async fn popular(&self) -> Result<Vec<Movie>, CatalogError> {
        let url = format!("{}/movie/popular", self.base_url);
        self.fetch(&url, &[("api_key", self.api_key.as_str())]).await
    }

    /// Search movies by free text. The query is percent-encoded by the
    /// query serializer before transmission.
    pub async fn search(&self, query: &str) -> Result<Vec<Movie>, CatalogError> {
        let url = format!("{}/search/movie", self.base_url);
        self.fetch(&url, &[("api_key", self.api_key.as_str()), ("query", query)])
            .await
    }

    async fn fetch(&self, url: &str, params: &[(&str, &str)]) -> Result<Vec<Movie>, CatalogError> {
        tracing::debug!(target: "catalog", url, "Sending catalog request");

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(CatalogError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Http { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(CatalogError::from_network_error)?;
        parse_results(&body)
    }
}

/// Parse a catalog response body into the movie list.
fn parse_results(body: &str) -> Result<Vec<Movie>, CatalogError> {
    let page: CatalogPage =
        serde_json::from_str(body).map_err(|e| CatalogError::MalformedPayload(e.to_string()))?;
    Ok(page.results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results_single_movie() {
        let body = r#"{"results":[{"id":1,"title":"Dune","poster_path":"/d.jpg","release_date":"2021-10-22"}]}"#;
        let movies = parse_results(body).unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, 1);
        assert_eq!(movies[0].title, "Dune");
        assert_eq!(movies[0].release_year(), Some("2021"));
    }

    #[test]
    fn test_parse_results_preserves_extra_fields() {
        let body = r#"{"results":[{"id":2,"title":"Heat","vote_average":8.3,"overview":"LA crime saga"}]}"#;
        let movies = parse_results(body).unwrap();
        assert_eq!(movies[0].extra["vote_average"], 8.3);

        // Round-trips through serialization (favorites persistence relies on this)
        let json = serde_json::to_value(&movies[0]).unwrap();
        assert_eq!(json["overview"], "LA crime saga");
    }

    #[test]
    fn test_parse_results_missing_results_is_typed_error() {
        let err = parse_results(r#"{"status_message":"Invalid API key"}"#).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload(_)));

        let err = parse_results("not json at all").unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload(_)));
    }

    #[test]
    fn test_parse_results_tolerates_missing_display_fields() {
        // Display fields are pass-through payload, never validated
        let movies = parse_results(r#"{"results":[{"id":9}]}"#).unwrap();
        assert_eq!(movies[0].id, 9);
        assert_eq!(movies[0].title, "");
        assert_eq!(movies[0].release_year(), None);
    }

    #[tokio::test]
    async fn test_http_error_is_typed() {
        // Point at a closed port so the request fails at the network layer
        let client = CatalogClient::new(
            "http://127.0.0.1:1",
            "test-key",
            Duration::from_millis(250),
        );
        let err = client.popular().await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Network(_) | CatalogError::Timeout(_)
        ));
    }

    #[test]
    fn test_error_display() {
        let err = CatalogError::Http {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(err.to_string(), "Catalog HTTP 500: Internal Server Error");
    }
}
