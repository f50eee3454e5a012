//! Link resolver client
//!
//! Turns a share link into a direct download URL by calling an HTTP
//! resolver built from a `{link}` template. The resolver answers either with
//! JSON (the URL sits in one of a few well-known fields, or somewhere deeper)
//! or with plain text containing the URL.

use std::time::Duration;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::core::config::LINK_PLACEHOLDER;
use crate::error::ResolverError;

static SHARE_LINK_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://\S*(?:terabox|terasharelink)\S*").expect("valid share link regex")
});

static URL_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://\S+").expect("valid url regex"));

/// Fields checked first, in order, on a JSON object response
const DIRECT_URL_KEYS: &[&str] = &["download", "url", "link", "download_url"];

/// Returns the share link contained in `text`, if any
///
/// The first URL of the message is used as the link, which is the share
/// link itself in the common case of a message holding a single URL.
pub fn find_share_link(text: &str) -> Option<&str> {
    SHARE_LINK_RX.find(text)?;
    URL_RX.find(text).map(|m| m.as_str())
}

/// Substitutes the form-encoded link into the template
pub fn build_request_url(template: &str, link: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(link.as_bytes()).collect();
    template.replace(LINK_PLACEHOLDER, &encoded)
}

/// Extracts a direct URL from a resolver response body
pub fn extract_direct_url(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            let preferred = DIRECT_URL_KEYS.iter().find_map(|key| match map.get(*key) {
                Some(Value::String(s)) if s.starts_with("http") => Some(s.clone()),
                _ => None,
            });
            preferred.or_else(|| find_url(&Value::Object(map)))
        }
        Ok(Value::String(s)) => first_url(&s),
        Ok(other) => find_url(&other),
        Err(_) => first_url(body),
    }
}

fn find_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.starts_with("http") => Some(s.clone()),
        Value::String(s) => first_url(s),
        Value::Object(map) => map.values().find_map(find_url),
        Value::Array(items) => items.iter().find_map(find_url),
        _ => None,
    }
}

fn first_url(text: &str) -> Option<String> {
    URL_RX.find(text).map(|m| m.as_str().to_string())
}

pub struct LinkResolver {
    client: reqwest::Client,
    timeout: Duration,
}

impl LinkResolver {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Performs a single resolver call, without retrying
    pub async fn resolve(&self, template: &str, share_link: &str) -> Result<String, ResolverError> {
        let request_url = build_request_url(template, share_link);
        info!("Calling resolver: {}", request_url);

        let response = self
            .client
            .get(&request_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::NetworkError(format!(
                "resolver returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        debug!("Resolver answered {} bytes", body.len());

        match extract_direct_url(&body) {
            Some(url) => Ok(url),
            None => {
                let raw = serde_json::from_str::<Value>(&body).is_err().then_some(body);
                Err(ResolverError::ParseError { raw })
            }
        }
    }

    fn classify(&self, err: reqwest::Error) -> ResolverError {
        if err.is_timeout() {
            ResolverError::Timeout(self.timeout.as_secs())
        } else {
            ResolverError::NetworkError(err.to_string())
        }
    }
}
