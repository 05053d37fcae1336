//! Data models for the library portal
//!
//! Each backend resource has a `*Payload` type mirroring the (loosely shaped)
//! JSON the REST backend sends, and a canonical record built from it exactly
//! once, when the payload is fetched.

pub mod book;
pub mod dashboard;
pub mod loan;
pub mod member;
pub mod reservation;
pub mod user;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use validator::ValidationErrors;

// Re-export commonly used types
pub use book::{Book, BookCopy, BookPayload, CopyStatus, CreateBookRequest, UpdateBookRequest};
pub use dashboard::DashboardStats;
pub use loan::{Loan, LoanEntry, LoanPayload, LoanStatus};
pub use member::{Member, MemberPayload, MemberStatus};
pub use reservation::{Reservation, ReservationEntry, ReservationPayload, ReservationStatus};
pub use user::{Role, SessionUser};

/// Parse the timestamp formats the backend is known to emit.
///
/// Accepts RFC 3339, naive ISO date-times (assumed UTC) and plain dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|n| n.and_utc())
        })
}

/// Deserialize an optional timestamp; unparsable values become `None`
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Deserialize a date picked in a form; empty or malformed input counts as not picked
pub(crate) fn form_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

/// First validation message, following the order fields appear on the form
pub fn first_validation_message(errors: &ValidationErrors, field_order: &[&str]) -> String {
    let fields = errors.field_errors();
    field_order
        .iter()
        .filter_map(|name| {
            fields
                .iter()
                .find(|(field, _)| field.to_string() == *name)
                .map(|(_, errs)| errs)
        })
        .chain(fields.values())
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input".to_string())
}

/// Validator helper: reject empty or whitespace-only text
pub(crate) fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}
