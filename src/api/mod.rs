//! Page handlers of the library portal

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod reservations;
pub mod session;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    middleware,
    response::Redirect,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, LOGIN_PATH},
    services::sessions::{AuthSession, SessionContext},
    AppState,
};

/// Session of the current request, authenticated or not
pub struct CurrentSession(pub SessionContext);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .unwrap_or_else(SessionContext::anonymous);
        Ok(CurrentSession(ctx))
    }
}

/// Any logged-in user (`/user/*` pages)
pub struct MemberSession(pub AuthSession);

#[async_trait]
impl FromRequestParts<AppState> for MemberSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentSession(ctx) = CurrentSession::from_request_parts(parts, state).await?;
        ctx.session()
            .cloned()
            .map(MemberSession)
            .ok_or(AppError::LoginRequired)
    }
}

/// Logged-in administrator (`/admin/*` pages)
pub struct AdminSession(pub AuthSession);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MemberSession(session) = MemberSession::from_request_parts(parts, state).await?;
        if !session.user.is_admin() {
            tracing::info!("User {} denied access to an admin page", session.user.id);
            return Err(AppError::LoginRequired);
        }
        Ok(AdminSession(session))
    }
}

/// Build the portal router with every page, the session layer and the docs
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let pages = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/", get(|| async { Redirect::to(LOGIN_PATH) }))
        .route("/session", get(auth::current_session))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        // Member pages
        .route("/user/homepage", get(catalog::homepage))
        .route("/user/books", get(catalog::list_books))
        .route("/user/book/:id", get(catalog::book_detail))
        .route("/user/book/:id/borrow", post(catalog::borrow_book))
        .route("/user/book/:id/reserve", post(catalog::reserve_book))
        .route("/user/my-loans", get(loans::my_loans))
        .route("/user/my-loans/:id/renew", post(loans::renew_loan))
        .route("/user/reservations", get(reservations::list_reservations))
        .route("/user/reservations/:id", get(reservations::get_reservation))
        .route("/user/reservations/:id/cancel", post(reservations::cancel_reservation))
        // Admin pages
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/catalog", get(admin::list_catalog).post(admin::create_book))
        .route(
            "/admin/catalog/:id",
            get(admin::get_book).patch(admin::update_book).delete(admin::delete_book),
        )
        .route("/admin/members", get(admin::list_members))
        .route("/admin/members/:id", get(admin::get_member).delete(admin::delete_member))
        .route("/admin/members/:id/status", patch(admin::update_member_status))
        .route("/admin/returns/:loan_id", get(admin::lookup_return).post(admin::confirm_return))
        .route_layer(middleware::from_fn_with_state(state.clone(), session::session_layer))
        .with_state(state);

    Router::new()
        .merge(pages)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
