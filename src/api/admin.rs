//! Admin console: dashboard, catalog management, members and returns

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    listing::{self, ListQuery, PageInfo},
    models::{
        Book, CreateBookRequest, DashboardStats, LoanEntry, LoanStatus, Member, MemberStatus,
        UpdateBookRequest,
    },
    status::today,
    AppState,
};

use super::{catalog::detail_page, catalog::BookDetailPage, AdminSession};

#[derive(Serialize, ToSchema)]
pub struct CatalogPage {
    pub books: Vec<Book>,
    #[serde(flatten)]
    pub page: PageInfo,
}

#[derive(Serialize, ToSchema)]
pub struct MembersPage {
    pub members: Vec<Member>,
    #[serde(flatten)]
    pub page: PageInfo,
}

#[derive(Deserialize, ToSchema)]
pub struct MemberStatusForm {
    pub status: MemberStatus,
}

/// Loan found by the return desk
#[derive(Serialize, ToSchema)]
pub struct ReturnLookup {
    pub loan: LoanEntry,
    /// False once the loan has been closed
    pub returnable: bool,
}

#[derive(Serialize, ToSchema)]
pub struct MemberStatusResponse {
    pub message: String,
    /// Member after the change, when it could be read back
    pub member: Option<Member>,
}

#[derive(Serialize, ToSchema)]
pub struct ReturnConfirmation {
    pub message: String,
    /// Closed loan, when it could be read back
    pub loan: Option<LoanEntry>,
}

/// Dashboard headline numbers
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "admin",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 303, description = "Not an administrator, redirect to /login")
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
) -> AppResult<Json<DashboardStats>> {
    Ok(Json(state.services.dashboard.stats(&session.token).await?))
}

/// Catalog table
#[utoipa::path(
    get,
    path = "/admin/catalog",
    tag = "admin",
    params(ListQuery),
    responses(
        (status = 200, description = "Catalog page", body = CatalogPage),
        (status = 303, description = "Not an administrator, redirect to /login")
    )
)]
pub async fn list_catalog(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<CatalogPage>> {
    let books = state.services.books.list(&session.token).await?;
    let page = listing::apply(books, &query, state.config.catalog.admin_page_size);
    Ok(Json(CatalogPage {
        books: page.items,
        page: page.info,
    }))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/admin/catalog",
    tag = "admin",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    WithRejection(Json(request), _): WithRejection<Json<CreateBookRequest>, AppError>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.books.create(&session.token, &request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

#[utoipa::path(
    get,
    path = "/admin/catalog/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book detail", body = BookDetailPage),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<i64>,
) -> AppResult<Json<BookDetailPage>> {
    let book = state.services.books.get(&session.token, id).await?;
    Ok(Json(detail_page(book, today())))
}

/// Update some fields of a book
#[utoipa::path(
    patch,
    path = "/admin/catalog/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Book ID")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<i64>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateBookRequest>, AppError>,
) -> AppResult<Json<Book>> {
    Ok(Json(state.services.books.update(&session.token, id, &request).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/catalog/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.books.delete(&session.token, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Member table
#[utoipa::path(
    get,
    path = "/admin/members",
    tag = "admin",
    params(ListQuery),
    responses(
        (status = 200, description = "Members page", body = MembersPage),
        (status = 303, description = "Not an administrator, redirect to /login")
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<MembersPage>> {
    let members = state.services.members.list(&session.token).await?;
    let page = listing::apply(members, &query, state.config.catalog.admin_page_size);
    Ok(Json(MembersPage {
        members: page.items,
        page: page.info,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/members/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<i64>,
) -> AppResult<Json<Member>> {
    Ok(Json(state.services.members.get(&session.token, id).await?))
}

/// Activate, suspend or ban a member
#[utoipa::path(
    patch,
    path = "/admin/members/{id}/status",
    tag = "admin",
    params(("id" = i64, Path, description = "Member ID")),
    request_body = MemberStatusForm,
    responses(
        (status = 200, description = "Status updated", body = MemberStatusResponse),
        (status = 400, description = "Unknown status", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_member_status(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<i64>,
    WithRejection(Json(form), _): WithRejection<Json<MemberStatusForm>, AppError>,
) -> AppResult<Json<MemberStatusResponse>> {
    let member = state
        .services
        .members
        .update_status(&session.token, id, form.status)
        .await?;
    Ok(Json(MemberStatusResponse {
        message: format!("Member status set to {}", form.status.label()),
        member,
    }))
}

#[utoipa::path(
    delete,
    path = "/admin/members/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Member ID")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.members.delete(&session.token, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Look up a loan at the return desk
#[utoipa::path(
    get,
    path = "/admin/returns/{loan_id}",
    tag = "admin",
    params(("loan_id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan to return", body = ReturnLookup),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn lookup_return(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(loan_id): Path<i64>,
) -> AppResult<Json<ReturnLookup>> {
    let loan = state.services.loans.get(&session.token, loan_id).await?;
    Ok(Json(ReturnLookup {
        returnable: loan.status != LoanStatus::Returned,
        loan: loan.entry(today()),
    }))
}

/// Confirm a return, recorded as handled by the current admin
#[utoipa::path(
    post,
    path = "/admin/returns/{loan_id}",
    tag = "admin",
    params(("loan_id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Book returned", body = ReturnConfirmation),
        (status = 400, description = "Return refused", body = crate::error::ErrorResponse)
    )
)]
pub async fn confirm_return(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    Path(loan_id): Path<i64>,
) -> AppResult<Json<ReturnConfirmation>> {
    let loan = state
        .services
        .loans
        .return_loan(&session.token, loan_id, Some(session.user.id))
        .await?;
    let message = match &loan {
        Some(loan) => format!("\"{}\" returned successfully", loan.book_title),
        None => "Book returned successfully".to_string(),
    };
    Ok(Json(ReturnConfirmation {
        message,
        loan: loan.map(|l| l.entry(today())),
    }))
}
