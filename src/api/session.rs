//! Session cookie and per-request session restoration

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{config::SessionConfig, error::SessionExpired, AppState};

/// Cookie carrying a freshly established session id
pub fn session_cookie(config: &SessionConfig, id: &str) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), id.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie instructing the browser to drop the session id
pub fn removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), "")).path("/").build()
}

/// Restore the session named by the cookie and hand it to the handlers.
///
/// When the handler reports that the backend rejected the token, the stored
/// session is destroyed and the cookie removed.
pub async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let config = &state.config.session;
    let cookie_id = jar.get(&config.cookie_name).map(|c| c.value().to_string());
    let ctx = state.services.sessions.restore(cookie_id.as_deref()).await;
    let restored_id = ctx.id().map(str::to_string);

    request.extensions_mut().insert(ctx);
    let response = next.run(request).await;

    if response.extensions().get::<SessionExpired>().is_none() {
        return response;
    }

    tracing::info!("Backend rejected the session token, logging out");
    if let Some(id) = restored_id {
        state.services.sessions.forget(&id).await;
    }
    (jar.remove(removal_cookie(config)), response).into_response()
}
