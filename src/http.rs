use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::golem_error::{GolemError, Result};

/// Build a client that sends `headers` (plus a JSON content type) on every request.
pub fn build_client(headers: &[(&str, String)], timeout: Duration) -> Result<reqwest::Client> {
    let mut map = HeaderMap::new();
    map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| GolemError::Config(format!("Invalid header name '{}'", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| GolemError::Config(format!("Invalid value for header '{}'", name)))?;
        map.insert(name, value);
    }

    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(map)
        .build()
        .map_err(|e| GolemError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Send a request and return the body if the status matches `expected`.
pub async fn send(request: RequestBuilder, expected: u16) -> Result<String> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;

    if status != expected {
        return Err(GolemError::UnexpectedStatus { status, body });
    }

    Ok(body)
}

/// Send a request and decode its JSON body.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder, expected: u16) -> Result<T> {
    let body = send(request, expected).await?;
    if body.trim().is_empty() {
        return Err(GolemError::UnexpectedResponse(
            "empty response body".to_string(),
        ));
    }
    Ok(serde_json::from_str(&body)?)
}

/// PostgREST equality filter value: `eq.<value>`.
pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}
