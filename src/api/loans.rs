//! Member loan pages

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    listing::{self, ListQuery, PageInfo},
    models::LoanEntry,
    status::{today, LoanDisplayStatus},
    AppState,
};

use super::MemberSession;

#[derive(Serialize, ToSchema)]
pub struct MyLoansPage {
    pub loans: Vec<LoanEntry>,
    #[serde(flatten)]
    pub page: PageInfo,
    /// Overdue loans, shown in the alert banner when non-zero
    pub overdue: usize,
    pub due_soon: usize,
    pub active: usize,
}

#[derive(Serialize, ToSchema)]
pub struct RenewResponse {
    pub message: String,
    /// Loan with its new due date, when it could be read back
    pub loan: Option<LoanEntry>,
}

/// Loans of the logged-in member with their display status
#[utoipa::path(
    get,
    path = "/user/my-loans",
    tag = "loans",
    params(ListQuery),
    responses(
        (status = 200, description = "Member loans", body = MyLoansPage),
        (status = 303, description = "Not logged in, redirect to /login")
    )
)]
pub async fn my_loans(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<MyLoansPage>> {
    let today = today();
    let entries: Vec<LoanEntry> = state
        .services
        .loans
        .my_loans(&session.token)
        .await?
        .into_iter()
        .map(|loan| loan.entry(today))
        .collect();

    let count = |status: LoanDisplayStatus| entries.iter().filter(|e| e.display_status == status).count();
    let overdue = count(LoanDisplayStatus::Overdue);
    let due_soon = count(LoanDisplayStatus::DueSoon);
    let active = count(LoanDisplayStatus::Active);

    let page = listing::apply(entries, &query, state.config.catalog.admin_page_size);
    Ok(Json(MyLoansPage {
        loans: page.items,
        page: page.info,
        overdue,
        due_soon,
        active,
    }))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/user/my-loans/{id}/renew",
    tag = "loans",
    params(("id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan renewed", body = RenewResponse),
        (status = 400, description = "Renewal refused by the library", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew_loan(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
    Path(id): Path<i64>,
) -> AppResult<Json<RenewResponse>> {
    let loan = state.services.loans.renew(&session.token, id).await?;
    Ok(Json(RenewResponse {
        message: "Loan renewed successfully".to_string(),
        loan: loan.map(|l| l.entry(today())),
    }))
}
