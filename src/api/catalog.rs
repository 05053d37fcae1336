//! Member catalog pages: homepage, book listing, book detail, borrow and reserve

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    listing::{self, ListQuery, PageInfo},
    models::{form_date, Book, Loan, Reservation, SessionUser},
    services::loans::MAX_LOAN_DAYS,
    status::{self, today},
    AppState,
};

use super::MemberSession;

/// Books featured on the homepage
const FEATURED_BOOKS: usize = 8;
/// Genres listed under "Popular Categories"
const POPULAR_CATEGORIES: usize = 6;

#[derive(Serialize, ToSchema)]
pub struct CategoryCount {
    pub name: String,
    pub books: usize,
}

#[derive(Serialize, ToSchema)]
pub struct HomePage {
    pub user: SessionUser,
    pub featured: Vec<Book>,
    pub popular_categories: Vec<CategoryCount>,
}

#[derive(Serialize, ToSchema)]
pub struct BooksPage {
    pub books: Vec<Book>,
    #[serde(flatten)]
    pub page: PageInfo,
    /// Every genre present in the catalog, for the category filter
    pub categories: Vec<String>,
}

/// Dates the borrow and reserve dialogs accept
#[derive(Serialize, ToSchema)]
pub struct DateWindow {
    pub min: NaiveDate,
    pub max: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct BookDetailPage {
    pub book: Book,
    pub status_label: String,
    /// e.g. "3 of 10 copies available"
    pub availability: String,
    pub can_borrow: bool,
    pub borrow_window: DateWindow,
    pub reserve_window: DateWindow,
    pub estimated_available_date: String,
}

#[derive(Deserialize, ToSchema)]
pub struct BorrowForm {
    /// Chosen return date (YYYY-MM-DD)
    #[serde(default, deserialize_with = "form_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub return_date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    /// Loan echoed by the backend, when it sent one
    pub loan: Option<Loan>,
    /// Book detail refreshed after the loan
    pub book: BookDetailPage,
}

#[derive(Deserialize, ToSchema)]
pub struct ReserveForm {
    #[serde(default, deserialize_with = "form_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "form_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct ReserveResponse {
    pub message: String,
    pub reservation: Option<Reservation>,
}

fn popular_categories(books: &[Book]) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for genre in books.iter().flat_map(|b| b.genres.iter()) {
        *counts.entry(genre.as_str()).or_default() += 1;
    }
    let mut categories: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(name, books)| CategoryCount {
            name: name.to_string(),
            books,
        })
        .collect();
    categories.sort_by(|a, b| b.books.cmp(&a.books).then_with(|| a.name.cmp(&b.name)));
    categories.truncate(POPULAR_CATEGORIES);
    categories
}

fn all_categories(books: &[Book]) -> Vec<String> {
    let mut names: Vec<String> = books.iter().flat_map(|b| b.genres.iter().cloned()).collect();
    names.sort_by_key(|n| listing::fold(n));
    names.dedup_by_key(|n| listing::fold(n));
    names
}

pub(crate) fn detail_page(book: Book, today: NaiveDate) -> BookDetailPage {
    BookDetailPage {
        status_label: book.status.label().to_string(),
        availability: format!(
            "{} of {} copies available",
            book.available_copies, book.total_copies
        ),
        can_borrow: book.can_borrow(),
        borrow_window: DateWindow {
            min: today + Duration::days(1),
            max: Some(today + Duration::days(MAX_LOAN_DAYS)),
        },
        reserve_window: DateWindow { min: today, max: None },
        estimated_available_date: status::estimated_available_date(&book, today),
        book,
    }
}

/// Member homepage
#[utoipa::path(
    get,
    path = "/user/homepage",
    tag = "catalog",
    responses(
        (status = 200, description = "Featured books and categories", body = HomePage),
        (status = 303, description = "Not logged in, redirect to /login")
    )
)]
pub async fn homepage(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
) -> AppResult<Json<HomePage>> {
    let books = state.services.books.list(&session.token).await?;
    let popular_categories = popular_categories(&books);

    Ok(Json(HomePage {
        user: session.user,
        featured: books.into_iter().take(FEATURED_BOOKS).collect(),
        popular_categories,
    }))
}

/// Searchable, paginated member catalog
#[utoipa::path(
    get,
    path = "/user/books",
    tag = "catalog",
    params(ListQuery),
    responses(
        (status = 200, description = "Matching books", body = BooksPage),
        (status = 303, description = "Not logged in, redirect to /login")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<BooksPage>> {
    let books = state.services.books.list(&session.token).await?;
    let categories = all_categories(&books);
    let page = listing::apply(books, &query, state.config.catalog.page_size);

    Ok(Json(BooksPage {
        books: page.items,
        page: page.info,
        categories,
    }))
}

/// Book detail with availability and the borrow/reserve windows
#[utoipa::path(
    get,
    path = "/user/book/{id}",
    tag = "catalog",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book detail", body = BookDetailPage),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn book_detail(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
    Path(id): Path<i64>,
) -> AppResult<Json<BookDetailPage>> {
    let book = state.services.books.get(&session.token, id).await?;
    Ok(Json(detail_page(book, today())))
}

/// Borrow the first available copy
#[utoipa::path(
    post,
    path = "/user/book/{id}/borrow",
    tag = "catalog",
    params(("id" = i64, Path, description = "Book ID")),
    request_body = BorrowForm,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 400, description = "Invalid return date or no copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
    Path(id): Path<i64>,
    WithRejection(Json(form), _): WithRejection<Json<BorrowForm>, AppError>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let today = today();
    let book = state.services.books.get(&session.token, id).await?;
    let loan = state
        .services
        .loans
        .borrow(&session.token, &book, form.return_date, today)
        .await?;
    let message = format!("Successfully borrowed \"{}\"!", book.title);

    // The loan exists from here on; a failed reload only leaves the page stale
    let refreshed = match state.services.books.get(&session.token, id).await {
        Ok(refreshed) => refreshed,
        Err(e) => {
            tracing::warn!("Book {} not reloaded after borrowing: {}", id, e);
            book
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            message,
            loan,
            book: detail_page(refreshed, today),
        }),
    ))
}

/// Reserve a title for a pickup window
#[utoipa::path(
    post,
    path = "/user/book/{id}/reserve",
    tag = "catalog",
    params(("id" = i64, Path, description = "Book ID")),
    request_body = ReserveForm,
    responses(
        (status = 201, description = "Reservation created", body = ReserveResponse),
        (status = 400, description = "Invalid window", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reserve_book(
    State(state): State<AppState>,
    MemberSession(session): MemberSession,
    Path(id): Path<i64>,
    WithRejection(Json(form), _): WithRejection<Json<ReserveForm>, AppError>,
) -> AppResult<(StatusCode, Json<ReserveResponse>)> {
    let book = state.services.books.get(&session.token, id).await?;
    let reservation = state
        .services
        .reservations
        .reserve(&session.token, book.id, form.start_date, form.end_date, today())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReserveResponse {
            message: format!(
                "Successfully reserved \"{}\"! You will be notified when available.",
                book.title
            ),
            reservation,
        }),
    ))
}
