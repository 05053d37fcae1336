//! Reservation models

use std::convert::Infallible;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DeserializeFromStr};
use utoipa::ToSchema;

use super::book::AuthorLink;
use super::lenient_timestamp;
use crate::status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, DeserializeFromStr, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Fulfilled,
    Cancelled,
    Expired,
    Unknown,
}

impl FromStr for ReservationStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "PENDING" => ReservationStatus::Pending,
            "FULFILLED" => ReservationStatus::Fulfilled,
            "CANCELLED" | "CANCELED" => ReservationStatus::Cancelled,
            "EXPIRED" => ReservationStatus::Expired,
            _ => ReservationStatus::Unknown,
        })
    }
}

impl ReservationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Fulfilled => "Fulfilled",
            ReservationStatus::Cancelled => "Cancelled",
            ReservationStatus::Expired => "Expired",
            ReservationStatus::Unknown => "Unknown",
        }
    }

    /// Only pending reservations can still be cancelled by the member
    pub fn is_cancellable(&self) -> bool {
        *self == ReservationStatus::Pending
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedBookRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub authors: Vec<AuthorLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservingMemberRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Reservation as sent by `/reservations` endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPayload {
    pub id: i64,
    #[serde(default)]
    pub member_id: Option<i64>,
    #[serde(default)]
    pub book_id: Option<i64>,
    #[serde(default)]
    pub status: Option<ReservationStatus>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub reserved_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub fulfilled_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub book: Option<ReservedBookRef>,
    #[serde(default)]
    pub member: Option<ReservingMemberRef>,
}

/// Canonical reservation record
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Reservation {
    pub id: i64,
    pub member_id: Option<i64>,
    pub member_name: Option<String>,
    pub book_id: Option<i64>,
    pub book_title: String,
    pub book_author: String,
    pub cover_url: Option<String>,
    pub status: ReservationStatus,
    pub reserved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<ReservationPayload> for Reservation {
    fn from(p: ReservationPayload) -> Self {
        let book = p.book;
        let first_author = book
            .as_ref()
            .and_then(|b| b.authors.iter().find_map(|a| a.author.as_ref()))
            .map(|a| a.name.trim().to_string())
            .filter(|n| !n.is_empty());

        Self {
            id: p.id,
            member_id: p.member_id.or_else(|| p.member.as_ref().and_then(|m| m.id)),
            member_name: p.member.and_then(|m| m.name),
            book_id: p.book_id.or_else(|| book.as_ref().and_then(|b| b.id)),
            book_title: book
                .as_ref()
                .and_then(|b| b.title.as_deref())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or("Unknown Book")
                .to_string(),
            book_author: first_author.unwrap_or_else(|| "Unknown Author".to_string()),
            cover_url: book.and_then(|b| b.cover_url),
            status: p.status.unwrap_or(ReservationStatus::Unknown),
            reserved_at: p.reserved_at.or(p.created_at),
            expires_at: p.expires_at,
            fulfilled_at: p.fulfilled_at,
            cancelled_at: p.cancelled_at,
            start_date: p.start_date,
            end_date: p.end_date,
        }
    }
}

impl Reservation {
    pub fn entry(self) -> ReservationEntry {
        ReservationEntry {
            status_label: self.status.label().to_string(),
            cancellable: self.status.is_cancellable(),
            reserved_at_label: status::format_date(self.reserved_at),
            expires_at_label: status::format_date(self.expires_at),
            reservation: self,
        }
    }
}

/// Reservation row as shown on the reservations page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationEntry {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub status_label: String,
    pub cancellable: bool,
    pub reserved_at_label: String,
    pub expires_at_label: String,
}

/// Body of `POST /reservations`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub book_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Counters shown above the reservation list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReservationStats {
    pub total: usize,
    pub pending: usize,
    pub fulfilled: usize,
    pub cancelled: usize,
}

impl ReservationStats {
    pub fn tally<'a>(reservations: impl IntoIterator<Item = &'a Reservation>) -> Self {
        reservations
            .into_iter()
            .fold(Self::default(), |mut stats, r| {
                stats.total += 1;
                match r.status {
                    ReservationStatus::Pending => stats.pending += 1,
                    ReservationStatus::Fulfilled => stats.fulfilled += 1,
                    ReservationStatus::Cancelled => stats.cancelled += 1,
                    _ => {}
                }
                stats
            })
    }
}
