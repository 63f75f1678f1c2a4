//! Request and response snapshots flowing through the cache manager.

use std::fmt;

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

/// URL schemes that belong to the browser itself and are never intercepted.
const INTERNAL_SCHEMES: [&str; 6] = [
    "chrome-extension",
    "moz-extension",
    "safari-extension",
    "about",
    "data",
    "blob",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// A full page load
    Navigate,
    /// Subresource fetch
    #[default]
    Cors,
}

/// What the page intends to do with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    #[default]
    Empty,
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
}

/// Lookup key of a cache entry: method plus absolute URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::default(),
            destination: Destination::default(),
        }
    }

    /// A top-level page load
    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            destination: Destination::Document,
            ..Self::get(url)
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn key(&self) -> RequestKey {
        let mut url = self.url.clone();
        url.set_fragment(None);
        RequestKey(format!("{} {}", self.method, url))
    }

    pub fn is_internal_scheme(&self) -> bool {
        INTERNAL_SCHEMES.contains(&self.url.scheme())
    }

    /// Only GET requests to ordinary schemes are ever intercepted
    pub fn is_interceptable(&self) -> bool {
        self.method == Method::GET && !self.is_internal_scheme()
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Images, scripts, styles, and any URL carrying the icon marker
    /// (query string included)
    pub fn is_static_asset(&self, icon_marker: &str) -> bool {
        matches!(
            self.destination,
            Destination::Image | Destination::Script | Destination::Style
        ) || self.url.as_str().contains(icon_marker)
    }
}

/// Captured response: everything needed to replay it later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Only complete 200 responses are worth keeping
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_key_ignores_fragment() {
        let a = Request::get(url("https://criyago.app/games?page=2#top"));
        let b = Request::get(url("https://criyago.app/games?page=2"));
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "GET https://criyago.app/games?page=2");
    }

    #[test]
    fn test_interceptable() {
        assert!(Request::get(url("https://criyago.app/")).is_interceptable());
        assert!(!Request::get(url("https://criyago.app/api"))
            .with_method(Method::POST)
            .is_interceptable());
        assert!(!Request::get(url("chrome-extension://abcdef/popup.js")).is_interceptable());
    }

    #[test]
    fn test_static_asset_detection() {
        let icon = Request::get(url("https://criyago.app/icon-192.jpg"));
        assert!(icon.is_static_asset("/icon-"));

        let script = Request::get(url("https://criyago.app/app.js")).with_destination(Destination::Script);
        assert!(script.is_static_asset("/icon-"));

        let api = Request::get(url("https://criyago.app/api/games"));
        assert!(!api.is_static_asset("/icon-"));

        // The marker may sit in the query string of a resizing endpoint
        let resized = Request::get(url("https://criyago.app/api/image?src=/icon-512.jpg&w=96"));
        assert!(resized.is_static_asset("/icon-"));
    }

    #[test]
    fn test_only_200_is_cacheable() {
        assert!(Response::new("https://criyago.app/", 200, "ok").is_cacheable());
        assert!(!Response::new("https://criyago.app/", 206, "o").is_cacheable());
        assert!(!Response::new("https://criyago.app/", 304, "").is_cacheable());
    }
}
