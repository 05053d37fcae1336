//! Loan models

use std::convert::Infallible;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DeserializeFromStr};
use utoipa::ToSchema;

use super::book::AuthorLink;
use super::lenient_timestamp;
use crate::status::{self, LoanDisplayStatus};

/// Loan status as stored by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, DeserializeFromStr, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
    Unknown,
}

impl FromStr for LoanStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "ACTIVE" => LoanStatus::Active,
            "OVERDUE" => LoanStatus::Overdue,
            "RETURNED" => LoanStatus::Returned,
            _ => LoanStatus::Unknown,
        })
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct LoanBookRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub authors: Vec<AuthorLink>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanCopyRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub inventory_code: Option<String>,
    #[serde(default)]
    pub book: Option<LoanBookRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoanMemberRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user: Option<UserRef>,
}

/// Loan as sent by `/loans` endpoints
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPayload {
    pub id: i64,
    #[serde(default)]
    pub member_id: Option<i64>,
    #[serde(default)]
    pub copy_id: Option<i64>,
    #[serde(default, alias = "borrowDate", alias = "borrowedAt", deserialize_with = "lenient_timestamp")]
    pub loan_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "returnedAt", alias = "returnedDate", deserialize_with = "lenient_timestamp")]
    pub return_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<LoanStatus>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default, alias = "renewCount")]
    pub renewal_count: u32,
    #[serde(default)]
    pub copy: Option<LoanCopyRef>,
    #[serde(default)]
    pub member: Option<LoanMemberRef>,
}

/// Canonical loan record
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Loan {
    pub id: i64,
    pub member_id: Option<i64>,
    pub member_name: Option<String>,
    pub member_email: Option<String>,
    pub copy_id: Option<i64>,
    pub inventory_code: Option<String>,
    pub book_id: Option<i64>,
    pub book_title: String,
    pub book_author: String,
    pub loan_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub renewal_count: u32,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl From<LoanPayload> for Loan {
    fn from(p: LoanPayload) -> Self {
        let copy = p.copy;
        let book = copy.as_ref().and_then(|c| c.book.clone());
        let member = p.member;
        let user = member.as_ref().and_then(|m| m.user.clone());

        let authors: Vec<String> = book
            .as_ref()
            .map(|b| {
                b.authors
                    .iter()
                    .filter_map(|a| a.author.as_ref())
                    .map(|a| a.name.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let member_name = non_empty(member.as_ref().and_then(|m| m.name.clone()))
            .or_else(|| non_empty(user.as_ref().and_then(|u| u.name.clone())))
            .or_else(|| non_empty(user.as_ref().and_then(|u| u.username.clone())));
        let member_email = non_empty(member.as_ref().and_then(|m| m.email.clone()))
            .or_else(|| non_empty(user.as_ref().and_then(|u| u.email.clone())));

        Self {
            id: p.id,
            member_id: p.member_id.or_else(|| member.as_ref().and_then(|m| m.id)),
            member_name,
            member_email,
            copy_id: p.copy_id.or_else(|| copy.as_ref().and_then(|c| c.id)),
            inventory_code: non_empty(copy.as_ref().and_then(|c| c.inventory_code.clone())),
            book_id: book.as_ref().and_then(|b| b.id),
            book_title: non_empty(book.and_then(|b| b.title))
                .unwrap_or_else(|| "Unknown Book".to_string()),
            book_author: if authors.is_empty() {
                "Unknown Author".to_string()
            } else {
                authors.join(", ")
            },
            loan_date: p.loan_date,
            due_date: p.due_date,
            return_date: p.return_date,
            status: p.status.unwrap_or(LoanStatus::Unknown),
            renewal_count: p.renewal_count,
        }
    }
}

impl Loan {
    /// Attach the display status and date labels for `today`
    pub fn entry(self, today: NaiveDate) -> LoanEntry {
        let display_status = status::loan_status(self.status, self.due_date, today);
        let days_until_due = self.due_date.map(|due| status::days_until_due(due, today));
        LoanEntry {
            display_status,
            status_label: display_status.label().to_string(),
            days_until_due,
            loan_date_label: status::format_date(self.loan_date),
            due_date_label: status::format_date(self.due_date),
            return_date_label: self.return_date.map(|d| status::format_date(Some(d))),
            loan: self,
        }
    }
}

/// Loan row as shown on the loans pages
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanEntry {
    #[serde(flatten)]
    pub loan: Loan,
    pub display_status: LoanDisplayStatus,
    pub status_label: String,
    pub days_until_due: Option<i64>,
    pub loan_date_label: String,
    pub due_date_label: String,
    pub return_date_label: Option<String>,
}
