//! Error types for the library portal

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::client::ApiError;

/// Where every authentication failure sends the browser
pub const LOGIN_PATH: &str = "/login";

/// Portal error codes reported to the browser shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    NoSuchData = 3,
    BadValue = 4,
    BackendFailure = 5,
    BackendUnavailable = 6,
}

/// Marker left on a response when the backend rejected the session token.
///
/// The session middleware looks for it to tear down the stored session.
#[derive(Debug, Clone, Copy)]
pub struct SessionExpired;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Login attempt refused (inline message on the login page)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Page needs a session (or a role) the visitor does not have
    #[error("Login required")]
    LoginRequired,

    /// The backend answered 401 to an authenticated call
    #[error("Session expired")]
    SessionExpired,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Caught before any request is sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend refused or failed the call
    #[error("Backend error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },

    /// The backend could not be reached
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a backend failure, preferring the server-provided message over `fallback`
    pub fn upstream(err: ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Unauthorized(_) => AppError::SessionExpired,
            ApiError::Status { status, message } => {
                let message = message.unwrap_or_else(|| fallback.to_string());
                if status == StatusCode::NOT_FOUND {
                    AppError::NotFound(message)
                } else if status.is_client_error() {
                    AppError::Upstream { status, message }
                } else {
                    AppError::Upstream {
                        status: StatusCode::BAD_GATEWAY,
                        message,
                    }
                }
            }
            ApiError::Transport(e) => {
                tracing::warn!("Backend transport error: {}", e);
                AppError::Unavailable(fallback.to_string())
            }
            ApiError::Decode(e) => {
                tracing::error!("Unexpected backend payload: {}", e);
                AppError::Upstream {
                    status: StatusCode::BAD_GATEWAY,
                    message: fallback.to_string(),
                }
            }
        }
    }
}

/// Unreadable form bodies are reported inline like any other form error
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::LoginRequired => {
                return Redirect::to(LOGIN_PATH).into_response();
            }
            AppError::SessionExpired => {
                let mut response = Redirect::to(LOGIN_PATH).into_response();
                response.extensions_mut().insert(SessionExpired);
                return response;
            }
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Upstream { status, message } => {
                (*status, ErrorCode::BackendFailure, message.clone())
            }
            AppError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::BackendUnavailable, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
