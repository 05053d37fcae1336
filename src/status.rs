//! User-facing status derivation
//!
//! Pure functions turning raw availability counts, loan dates and backend
//! enums into the labels shown on every page.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{book::Book, CopyStatus, LoanStatus};

/// A title is "Limited" once at most this share of its copies is available
const LIMITED_NUMERATOR: u64 = 3;
const LIMITED_DENOMINATOR: u64 = 10;

/// Loans due within this many days are flagged "Due Soon"
pub const DUE_SOON_DAYS: i64 = 3;

/// Fallback estimate when copies are out on loan and the backend gave no date
pub const ESTIMATED_LOAN_DAYS: i64 = 14;

pub const INVALID_DATE: &str = "Invalid Date";

/// Current calendar day (UTC)
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum BookStatus {
    Available,
    Limited,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl BookStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::Limited => "Limited",
            BookStatus::OutOfStock => "Out of Stock",
        }
    }

    /// Recognise a status precomputed by the backend
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "available" => Some(BookStatus::Available),
            "limited" => Some(BookStatus::Limited),
            "outofstock" | "unavailable" => Some(BookStatus::OutOfStock),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Derive the availability label from copy counts
pub fn book_status(available: u32, total: u32) -> BookStatus {
    if total == 0 || available == 0 {
        BookStatus::OutOfStock
    } else if u64::from(available) * LIMITED_DENOMINATOR <= u64::from(total) * LIMITED_NUMERATOR {
        BookStatus::Limited
    } else {
        BookStatus::Available
    }
}

/// Number of copies currently on the shelf
pub fn count_available<'a>(statuses: impl IntoIterator<Item = &'a CopyStatus>) -> usize {
    statuses
        .into_iter()
        .filter(|s| **s == CopyStatus::Available)
        .count()
}

/// Date shown in the reservation dialog
pub fn estimated_available_date(book: &Book, today: NaiveDate) -> String {
    if let Some(date) = book.estimated_available_date {
        return format_date(Some(date));
    }
    if !book.copies.iter().any(|c| c.status == CopyStatus::Loaned) {
        return "Unknown".to_string();
    }
    format_day(today + Duration::days(ESTIMATED_LOAN_DAYS))
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum LoanDisplayStatus {
    Active,
    Overdue,
    #[serde(rename = "Due Soon")]
    DueSoon,
    Returned,
}

impl LoanDisplayStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LoanDisplayStatus::Active => "Active",
            LoanDisplayStatus::Overdue => "Overdue",
            LoanDisplayStatus::DueSoon => "Due Soon",
            LoanDisplayStatus::Returned => "Returned",
        }
    }
}

/// Whole days from `today` until the due date (negative once past due)
pub fn days_until_due(due_date: DateTime<Utc>, today: NaiveDate) -> i64 {
    (due_date.date_naive() - today).num_days()
}

/// Derive the loan badge; backend `RETURNED`/`OVERDUE` always win
pub fn loan_status(
    status: LoanStatus,
    due_date: Option<DateTime<Utc>>,
    today: NaiveDate,
) -> LoanDisplayStatus {
    match status {
        LoanStatus::Returned => LoanDisplayStatus::Returned,
        LoanStatus::Overdue => LoanDisplayStatus::Overdue,
        LoanStatus::Active | LoanStatus::Unknown => match due_date {
            Some(due) if days_until_due(due, today) <= DUE_SOON_DAYS => LoanDisplayStatus::DueSoon,
            _ => LoanDisplayStatus::Active,
        },
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Render a timestamp as `Oct 16, 2026`
pub fn format_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => format_day(date.date_naive()),
        None => INVALID_DATE.to_string(),
    }
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%b %-d, %Y").to_string()
}
