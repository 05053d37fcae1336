//! Member reservation pages

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    listing::{self, ListQuery, PageInfo},
    models::{reservation::ReservationStats, ReservationEntry},
    AppState,
};

use super::MemberSession;

#[derive(Serialize, ToSchema)]
pub struct ReservationsPage {
    pub reservations: Vec<ReservationEntry>,
    #[serde(flatten)]
    pub page: PageInfo,
    pub stats: ReservationStats,
}

#[derive(Serialize, ToSchema)]
pub struct CancelResponse {
    pub message: String,
    /// Reservation list after the cancellation
    pub reservations: ReservationsPage,
}

async fn reservations_page(
    state: &AppState,
    token: &str,
    query: &ListQuery,
) -> AppResult<ReservationsPage> {
    let reservations = state.services.reservations.list(token).await?;
    let stats = ReservationStats::tally(&reservations);
    let entries: Vec<ReservationEntry> = reservations.into_iter().map(|r| r.entry()).collect();
    let page = listing::apply(entries, query, state.config.catalog.admin_page_size);

    Ok(ReservationsPage {
        reservations: page.items,
        page: page.info,
        stats,
    })
}

/// Reservations of the logged-in member
#[utoipa::path(
    get,
    path = "/user/reservations",
    tag = "reservations",
    params(ListQuery),
    responses(
        (status = 200, description = "Member reservations", body = ReservationsPage),
        (status = 303, description = "Not logged in, redirect to /login")
    )
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ReservationsPage>> {
    Ok(Json(reservations_page(&state, &session.token, &query).await?))
}

/// One reservation
#[utoipa::path(
    get,
    path = "/user/reservations/{id}",
    tag = "reservations",
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ReservationEntry),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
    Path(id): Path<i64>,
) -> AppResult<Json<ReservationEntry>> {
    let reservation = state.services.reservations.get(&session.token, id).await?;
    Ok(Json(reservation.entry()))
}

/// Cancel a reservation and return the refreshed list
#[utoipa::path(
    post,
    path = "/user/reservations/{id}/cancel",
    tag = "reservations",
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = CancelResponse),
        (status = 400, description = "Cancellation refused", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
    Path(id): Path<i64>,
) -> AppResult<Json<CancelResponse>> {
    state.services.reservations.cancel(&session.token, id).await?;
    let reservations = reservations_page(&state, &session.token, &ListQuery::default()).await?;

    Ok(Json(CancelResponse {
        message: "Reservation cancelled successfully!".to_string(),
        reservations,
    }))
}
