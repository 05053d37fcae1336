//! Login, registration, logout and session state pages

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult, LOGIN_PATH},
    models::{
        user::{LoginRequest, RegisterForm},
        SessionUser,
    },
    services::auth::{LoginOutcome, REGISTER_SUCCESS},
    AppState,
};

use super::{
    session::{removal_cookie, session_cookie},
    CurrentSession,
};

/// Successful login
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// Landing page for the user's role
    pub redirect_to: String,
    pub user: SessionUser,
}

/// Login page for a visitor without a session
#[derive(Serialize, ToSchema)]
pub struct LoginPage {
    pub authenticated: bool,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: Option<SessionUser>,
    pub redirect_to: String,
}

#[derive(Serialize, ToSchema)]
pub struct LogoutResponse {
    pub redirect_to: String,
}

/// Authentication state of the current browser session
#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Option<SessionUser>,
}

/// Login page; a logged-in user is sent to their landing page
#[utoipa::path(
    get,
    path = "/login",
    tag = "auth",
    responses(
        (status = 200, description = "Login form", body = LoginPage),
        (status = 303, description = "Already logged in, redirect to landing page")
    )
)]
pub async fn login_page(CurrentSession(ctx): CurrentSession) -> Response {
    match ctx.user() {
        Some(user) => Redirect::to(user.role().landing_page()).into_response(),
        None => Json(LoginPage { authenticated: false }).into_response(),
    }
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = LoginResponse),
        (status = 401, description = "Login rejected", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    CurrentSession(mut ctx): CurrentSession,
    jar: CookieJar,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let outcome = state
        .services
        .auth
        .login(&mut ctx, &request.username, &request.password)
        .await;

    match (outcome, ctx.id()) {
        (LoginOutcome::Authenticated(user), Some(id)) => Ok((
            jar.add(session_cookie(&state.config.session, id)),
            Json(LoginResponse {
                redirect_to: user.role().landing_page().to_string(),
                user,
            }),
        )),
        (LoginOutcome::Rejected(message), _) => Err(AppError::Authentication(message)),
        (LoginOutcome::Authenticated(_), None) => {
            Err(AppError::Internal("Session was not established".to_string()))
        }
    }
}

/// Create an account; the user logs in afterwards
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterForm,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<RegisterForm>, AppError>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let user = state.services.auth.register(&form).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: REGISTER_SUCCESS.to_string(),
            user,
            redirect_to: LOGIN_PATH.to_string(),
        }),
    ))
}

/// Log out; the session is cleared even if the backend call fails
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out, session cookie removed", body = LogoutResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(mut ctx): CurrentSession,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    state.services.auth.logout(&mut ctx).await;
    (
        jar.remove(removal_cookie(&state.config.session)),
        Json(LogoutResponse {
            redirect_to: LOGIN_PATH.to_string(),
        }),
    )
}

/// Current authentication state
#[utoipa::path(
    get,
    path = "/session",
    tag = "auth",
    responses(
        (status = 200, description = "Session state", body = SessionResponse)
    )
)]
pub async fn current_session(CurrentSession(ctx): CurrentSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: ctx.is_authenticated(),
        user: ctx.user().cloned(),
    })
}
