//! HTTP client for the library REST backend
//!
//! Every backend call goes through [`ApiClient::request`]: it attaches the
//! bearer token, strips the `{ data: ... }` envelope some endpoints wrap their
//! payload in, and classifies failures so the page layer can react to a
//! rejected session in one place.

use std::time::Duration;

use reqwest::{header::AUTHORIZATION, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::BackendConfig;

pub use reqwest::Method;

/// Failure of a backend call
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP 401: the token is missing, expired or revoked
    #[error("Unauthorized")]
    Unauthorized(Option<String>),

    /// Any other non-success status, with the server message when it sent one
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// Thin wrapper around a pooled `reqwest::Client` bound to the backend base URL
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request and return the unwrapped JSON body
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let value = self.send(method, path, token, body).await?;
        serde_json::from_value(unwrap_envelope(value)).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, ApiError> {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, token, body).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> Result<T, ApiError> {
        self.request(Method::PATCH, path, token, Some(body)).await
    }

    /// Issue a request whose reply body is informational.
    ///
    /// The record is returned when the body decodes as `T`; an empty body or a
    /// bare acknowledgement such as `{ "message": ... }` yields `None`.
    pub async fn request_optional<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Option<T>, ApiError> {
        let value = unwrap_envelope(self.send(method.clone(), path, token, body).await?);
        if value.is_null() {
            return Ok(None);
        }
        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::debug!("{} {}: reply is not a record: {}", method, path, e);
                Ok(None)
            }
        }
    }

    /// Issue a request and discard whatever body the backend sends back
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), ApiError> {
        self.send(method, path, token, body).await.map(|_| ())
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, token, None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);

        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                tracing::warn!("{} {}: backend unreachable: {}", method, path, e);
            } else if e.is_timeout() {
                tracing::warn!("{} {}: backend timed out", method, path);
            }
            ApiError::Transport(e)
        })?;

        let status = response.status();
        tracing::debug!("{} {} -> {}", method, path, status.as_u16());

        let bytes = response.bytes().await?;
        let value = if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            Value::Null
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => value,
                Err(_) if !status.is_success() => {
                    Value::String(String::from_utf8_lossy(&bytes).trim().to_string())
                }
                Err(e) => return Err(ApiError::Decode(e.to_string())),
            }
        };

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(error_message(&value)));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                message: error_message(&value),
            });
        }

        Ok(value)
    }
}

/// Strip the `{ data: ... }` envelope when present
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Extract the human readable message from an error body
fn error_message(body: &Value) -> Option<String> {
    match body {
        Value::Object(map) => ["message", "error"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                // Validation errors sometimes come back as a list of messages
                Value::Array(items) => items
                    .iter()
                    .find_map(|i| i.as_str().map(str::to_string)),
                _ => None,
            }),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
