//! Request/response model seen by the interception layer.
//!
//! These types are deliberately small: a request is a method, an absolute URL
//! and a mode; a response is a status, headers and a body snapshot. Bodies are
//! [`Bytes`], so cloning a response to store it is cheap.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Query parameters whose values never leave the process in logs or listings.
const REDACTED_PARAMS: &[&str] = &["api_key"];

/// `url` with credential-bearing query values replaced by `REDACTED`.
pub fn redact_url(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| REDACTED_PARAMS.contains(&k.as_ref())) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if REDACTED_PARAMS.contains(&k.as_ref()) { "REDACTED".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// How the request was initiated by the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    NoCors,
}

/// An outgoing request issued by a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
}

impl Request {
    /// A plain subresource GET.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::Cors }
    }

    /// A top-level navigation GET.
    pub fn navigate(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::Navigate }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// The URL as it may appear in logs and listings.
    pub fn display_url(&self) -> String {
        redact_url(&self.url)
    }

    /// Whether the URL path names an HTML document by suffix.
    pub fn targets_html(&self) -> bool {
        let path = self.url.path().to_ascii_lowercase();
        path.ends_with(".html") || path.ends_with(".htm")
    }
}

/// A response body snapshot with its status and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name` case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level failures. HTTP error statuses are responses, not errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// No connectivity at all.
    #[error("network unreachable")]
    Offline,

    /// The host imposed a timeout.
    #[error("request timeout")]
    Timeout,

    /// Connection reset, DNS failure, TLS failure and the like.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// The network as seen from the worker.
///
/// Implementations must resolve with a [`Response`] for every HTTP status and
/// only fail on transport errors.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_redact_url_hides_api_key() {
        let request = Request::get(url("https://api.test/3/search/movie?api_key=s3cret&query=star+wars"));
        assert_eq!(request.display_url(), "https://api.test/3/search/movie?api_key=REDACTED&query=star+wars");
        assert!(!request.display_url().contains("s3cret"));
    }

    #[test]
    fn test_redact_url_leaves_other_urls_alone() {
        let plain = url("https://app.test/search.html?q=alien");
        assert_eq!(redact_url(&plain), "https://app.test/search.html?q=alien");
    }

    #[test]
    fn test_request_constructors() {
        let nav = Request::navigate(url("https://app.test/"));
        assert!(nav.is_get());
        assert!(nav.is_navigation());

        let img = Request::get(url("https://app.test/img/logo.png"));
        assert!(!img.is_navigation());
        assert!(!img.targets_html());
    }

    #[test]
    fn test_method_case_insensitive() {
        let req = Request::get(url("https://app.test/")).with_method("get");
        assert!(req.is_get());
        let post = Request::get(url("https://app.test/")).with_method("POST");
        assert!(!post.is_get());
    }

    #[test]
    fn test_targets_html_ignores_query() {
        let req = Request::get(url("https://app.test/home.html?id=3"));
        assert!(req.targets_html());
        let req = Request::get(url("https://app.test/api?page=x.html"));
        assert!(!req.targets_html());
    }

    #[test]
    fn test_response_header_lookup() {
        let resp = Response::new(200, "hi").with_header("Content-Type", "text/html");
        assert_eq!(resp.content_type(), Some("text/html"));
        assert!(resp.ok());
        assert_eq!(resp.text(), "hi");
        assert!(!Response::new(404, "").ok());
    }
}
