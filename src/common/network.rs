use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Build a blocking client that sends `accept: application/json` and, when a
/// token is given, `Authorization: Bearer <token>` on every request.
pub fn default_client(token: Option<&str>, timeout: Option<Duration>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).context("api token is not a valid header value")?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    let mut builder = Client::builder().default_headers(headers);
    if let Some(t) = timeout {
        builder = builder.timeout(t);
    }
    builder.build().context("create http client")
}

/// Join an API path onto a base URL, tolerating slashes on either side.
pub fn join_url(base: &str, path: &str) -> String {
    let mut b = base.trim_end_matches('/').to_string();
    b.push('/');
    b.push_str(path.trim_start_matches('/'));
    b
}

/// Turn a transport failure into an [`ApiError`] tagged with the URL.
pub fn transport(url: &str) -> impl FnOnce(reqwest::Error) -> ApiError + '_ {
    move |source| ApiError::Transport { url: url.to_string(), source }
}

/// Pass 2xx responses through; anything else becomes [`ApiError::Status`]
/// carrying the body's `detail` field when there is one.
pub fn check_response(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    let text = resp.text().unwrap_or_default();
    Err(ApiError::Status { status, url, detail: extract_detail(&text) })
}

/// Read a successful response as JSON. An empty body decodes as `null`.
pub fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let url = resp.url().to_string();
    let text = resp.text().map_err(|source| ApiError::Transport { url: url.clone(), source })?;
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text).map_err(|source| ApiError::Decode { url, source })
}

/// `detail` of an error body: strings as-is, anything else rendered as JSON.
/// Falls back to the raw text when the body is not JSON.
pub fn extract_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(v) => match v.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        },
        Err(_) => Some(body.chars().take(200).collect()),
    }
}
