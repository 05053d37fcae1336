//! Login, registration and logout against the backend auth endpoints

use serde_json::json;
use validator::Validate;

use crate::{
    client::{ApiClient, ApiError},
    error::{AppError, AppResult},
    models::{
        first_validation_message,
        user::{AuthPayload, RegisterForm, RegisterRequest, REGISTER_FORM_FIELDS},
        SessionUser,
    },
    services::sessions::{SessionContext, SessionManager},
};

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const INVALID_RESPONSE: &str = "Invalid response from server";
pub const LOGIN_FAILED: &str = "Login failed. Please try again.";
pub const REGISTER_FAILED: &str = "Registration failed. Please try again.";
pub const REGISTER_SUCCESS: &str = "Registration successful! Please login with your credentials.";

/// Result of a login attempt; a rejection is an expected outcome, not an error
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(SessionUser),
    Rejected(String),
}

#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
    sessions: SessionManager,
}

impl AuthService {
    pub fn new(client: ApiClient, sessions: SessionManager) -> Self {
        Self { client, sessions }
    }

    /// Authenticate and store a new session in `ctx`
    #[tracing::instrument(skip(self, ctx, password))]
    pub async fn login(&self, ctx: &mut SessionContext, username: &str, password: &str) -> LoginOutcome {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return LoginOutcome::Rejected("Please enter username and password".to_string());
        }

        ctx.begin_login();
        match self.authenticate(ctx, username, password).await {
            Ok(user) => {
                tracing::info!("User {} logged in", user.id);
                LoginOutcome::Authenticated(user)
            }
            Err(message) => {
                tracing::info!("Login rejected: {}", message);
                ctx.abort_login();
                LoginOutcome::Rejected(message)
            }
        }
    }

    async fn authenticate(
        &self,
        ctx: &mut SessionContext,
        username: &str,
        password: &str,
    ) -> Result<SessionUser, String> {
        let payload: AuthPayload = self
            .client
            .post(
                "/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(_) => INVALID_CREDENTIALS.to_string(),
                ApiError::Status { message, .. } => {
                    message.unwrap_or_else(|| LOGIN_FAILED.to_string())
                }
                ApiError::Transport(_) => LOGIN_FAILED.to_string(),
                ApiError::Decode(_) => INVALID_RESPONSE.to_string(),
            })?;

        let (token, user) = match (payload.token, payload.user) {
            (Some(token), Some(user)) if !token.is_empty() => (token, user),
            _ => return Err(INVALID_RESPONSE.to_string()),
        };

        self.sessions
            .establish(ctx, token, user.clone())
            .await
            .map_err(|e| {
                tracing::error!("Failed to store session: {}", e);
                LOGIN_FAILED.to_string()
            })?;
        Ok(user)
    }

    /// Create an account; the user still has to log in afterwards
    #[tracing::instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: &RegisterForm) -> AppResult<Option<SessionUser>> {
        form.validate()
            .map_err(|e| AppError::Validation(first_validation_message(&e, REGISTER_FORM_FIELDS)))?;

        let body = serde_json::to_value(RegisterRequest::from(form))
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let payload: AuthPayload = self
            .client
            .post("/auth/register", None, Some(body))
            .await
            .map_err(|e| match e {
                // No session is involved yet, a 401 here is a plain refusal
                ApiError::Unauthorized(message) => AppError::Upstream {
                    status: axum::http::StatusCode::UNAUTHORIZED,
                    message: message.unwrap_or_else(|| REGISTER_FAILED.to_string()),
                },
                other => AppError::upstream(other, REGISTER_FAILED),
            })?;

        tracing::info!("Account registered");
        Ok(payload.user)
    }

    /// Best-effort backend logout; the local session is always torn down
    pub async fn logout(&self, ctx: &mut SessionContext) {
        if let Some(token) = ctx.token() {
            if let Err(e) = self
                .client
                .post::<serde_json::Value>("/auth/logout", Some(token), None)
                .await
            {
                tracing::warn!("Backend logout failed: {}", e);
            }
        }
        self.sessions.teardown(ctx).await;
    }
}
