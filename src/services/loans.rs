//! Loans service: borrowing, renewal and returns

use chrono::{Duration, NaiveDate, NaiveTime, SecondsFormat};
use serde_json::json;

use crate::{
    client::{ApiClient, Method},
    error::{AppError, AppResult},
    models::{dashboard::OverdueCount, Book, Loan, LoanPayload},
};

/// Longest loan a member may pick, in days from today
pub const MAX_LOAN_DAYS: i64 = 7;

/// Check the return date picked in the borrow dialog
pub fn validate_return_date(date: Option<NaiveDate>, today: NaiveDate) -> AppResult<NaiveDate> {
    let date = date.ok_or_else(|| AppError::Validation("Please select a return date".to_string()))?;
    let earliest = today + Duration::days(1);
    let latest = today + Duration::days(MAX_LOAN_DAYS);
    if date < earliest || date > latest {
        return Err(AppError::Validation(
            "Return date must be between tomorrow and 7 days from today".to_string(),
        ));
    }
    Ok(date)
}

/// Due timestamp sent to the backend: the last millisecond of the chosen day (UTC)
pub fn due_date_timestamp(date: NaiveDate) -> String {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(end_of_day)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone)]
pub struct LoansService {
    client: ApiClient,
}

impl LoansService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Borrow the first available copy of `book` until `return_date`.
    ///
    /// Nothing is sent to the backend unless the date and the copy check pass.
    /// The created loan is returned when the backend echoes it.
    #[tracing::instrument(skip(self, token, book), fields(book_id = book.id))]
    pub async fn borrow(
        &self,
        token: &str,
        book: &Book,
        return_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<Option<Loan>> {
        let return_date = validate_return_date(return_date, today)?;
        let copy = book
            .first_available_copy()
            .ok_or_else(|| AppError::Validation("No available copies found".to_string()))?;

        let payload: Option<LoanPayload> = self
            .client
            .request_optional(
                Method::POST,
                "/loans/borrow",
                Some(token),
                Some(json!({
                    "copyId": copy.id,
                    "dueDate": due_date_timestamp(return_date),
                })),
            )
            .await
            .map_err(|e| AppError::upstream(e, "Failed to borrow book"))?;

        tracing::info!("Copy {} borrowed", copy.id);
        Ok(payload.map(Loan::from))
    }

    /// Loans of the logged-in member
    pub async fn my_loans(&self, token: &str) -> AppResult<Vec<Loan>> {
        let payloads: Vec<LoanPayload> = self
            .client
            .get("/loans", Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to load loans"))?;
        Ok(payloads.into_iter().map(Loan::from).collect())
    }

    /// One loan with its copy, book, authors and borrower
    pub async fn get(&self, token: &str, id: i64) -> AppResult<Loan> {
        let payload: LoanPayload = self
            .client
            .get(
                &format!("/loans/{}?include=copy.book.authors,member.user", id),
                Some(token),
            )
            .await
            .map_err(|e| AppError::upstream(e, "Loan not found"))?;
        Ok(payload.into())
    }

    /// Loan as it stands after a successful write; `None` when it cannot be read back
    async fn reload(&self, token: &str, id: i64, reply: Option<LoanPayload>) -> Option<Loan> {
        if let Some(payload) = reply {
            return Some(payload.into());
        }
        match self.get(token, id).await {
            Ok(loan) => Some(loan),
            Err(e) => {
                tracing::warn!("Loan {} not reloaded: {}", id, e);
                None
            }
        }
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn renew(&self, token: &str, id: i64) -> AppResult<Option<Loan>> {
        let reply: Option<LoanPayload> = self
            .client
            .request_optional(Method::POST, &format!("/loans/{}/renew", id), Some(token), None)
            .await
            .map_err(|e| AppError::upstream(e, "Failed to renew loan"))?;
        tracing::info!("Loan {} renewed", id);
        Ok(self.reload(token, id, reply).await)
    }

    /// Close a loan, recording the admin who handled the return when known
    #[tracing::instrument(skip(self, token))]
    pub async fn return_loan(
        &self,
        token: &str,
        id: i64,
        handled_by: Option<i64>,
    ) -> AppResult<Option<Loan>> {
        let body = match handled_by {
            Some(admin_id) => json!({ "handledBy": admin_id }),
            None => json!({}),
        };
        let reply: Option<LoanPayload> = self
            .client
            .request_optional(Method::POST, &format!("/loans/{}/return", id), Some(token), Some(body))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to return book"))?;
        tracing::info!("Loan {} returned", id);
        Ok(self.reload(token, id, reply).await)
    }

    pub async fn overdue_count(&self, token: &str) -> AppResult<u64> {
        let count: OverdueCount = self
            .client
            .get("/loans/overdue/count", Some(token))
            .await
            .map_err(|e| AppError::upstream(e, "Failed to load overdue count"))?;
        Ok(count.count)
    }
}
