//! Book (catalog title) and copy models

use std::convert::Infallible;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DeserializeFromStr};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::{lenient_timestamp, not_blank};
use crate::status::{self, BookStatus};

/// Physical copy status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, DeserializeFromStr, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyStatus {
    Available,
    Loaned,
    Reserved,
    Lost,
    Maintenance,
    Unknown,
}

impl FromStr for CopyStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "AVAILABLE" => CopyStatus::Available,
            "LOANED" => CopyStatus::Loaned,
            "RESERVED" => CopyStatus::Reserved,
            "LOST" => CopyStatus::Lost,
            "MAINTENANCE" => CopyStatus::Maintenance,
            _ => CopyStatus::Unknown,
        })
    }
}

/// A single physical copy of a title
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookCopy {
    pub id: i64,
    #[serde(default, alias = "inventoryCode")]
    pub inventory_code: Option<String>,
    pub status: CopyStatus,
    #[serde(default)]
    pub location: Option<String>,
}

/// Reference to a named entity (author, genre)
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorLink {
    #[serde(default)]
    pub author: Option<NamedRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenreLink {
    #[serde(default)]
    pub genre: Option<NamedRef>,
}

/// Book as sent by `GET /catalog/books[/:id]`.
///
/// Depending on the endpoint and backend version, availability comes as
/// precomputed counts, as a copy list, or both.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    pub id: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub authors: Vec<AuthorLink>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub genres: Vec<GenreLink>,
    #[serde(default)]
    pub copies: Option<Vec<BookCopy>>,
    #[serde(default)]
    pub total_copies: Option<i64>,
    #[serde(default)]
    pub available_copies: Option<i64>,
    #[serde(default)]
    pub author_names: Option<String>,
    #[serde(default)]
    pub genre_names: Option<String>,
    #[serde(default)]
    pub copies_count: Option<i64>,
    #[serde(default)]
    pub available_count: Option<i64>,
    #[serde(default)]
    pub calculated_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub estimated_available_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Canonical book record used by every page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub language: Option<String>,
    pub cover_url: Option<String>,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
    pub copies: Vec<BookCopy>,
    pub available_copies: u32,
    pub total_copies: u32,
    pub status: BookStatus,
    pub estimated_available_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Book {
    /// Copy a new loan would be made on
    pub fn first_available_copy(&self) -> Option<&BookCopy> {
        self.copies.iter().find(|c| c.status == CopyStatus::Available)
    }

    pub fn can_borrow(&self) -> bool {
        self.first_available_copy().is_some()
    }

    /// Authors joined for display
    pub fn author_line(&self) -> String {
        if self.authors.is_empty() {
            "Unknown Author".to_string()
        } else {
            self.authors.join(", ")
        }
    }
}

/// Names from nested links, falling back to the flattened comma-separated field
fn names(links: Vec<Option<NamedRef>>, flattened: Option<String>) -> Vec<String> {
    let nested: Vec<String> = links
        .into_iter()
        .flatten()
        .map(|r| r.name.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    if !nested.is_empty() {
        return nested;
    }
    flattened
        .map(|s| {
            s.split(',')
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn non_negative(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

impl From<BookPayload> for Book {
    fn from(p: BookPayload) -> Self {
        let copies = p.copies.unwrap_or_default();
        let listed = !copies.is_empty();

        let available = p
            .available_count
            .or(p.available_copies)
            .or_else(|| listed.then(|| status::count_available(copies.iter().map(|c| &c.status)) as i64))
            .map(non_negative)
            .unwrap_or(0);
        let total = p
            .copies_count
            .or(p.total_copies)
            .or_else(|| listed.then(|| copies.len() as i64))
            .map(non_negative)
            .unwrap_or(0);
        let available = available.min(total);

        let status = p
            .calculated_status
            .as_deref()
            .and_then(BookStatus::from_label)
            .unwrap_or_else(|| status::book_status(available, total));

        Self {
            id: p.id,
            title: p.title,
            subtitle: p.subtitle,
            isbn: p.isbn,
            description: p.description,
            publisher: p.publisher,
            publication_year: p.publication_year,
            language: p.language,
            cover_url: p.cover_url,
            authors: names(p.authors.into_iter().map(|a| a.author).collect(), p.author_names),
            genres: names(p.genres.into_iter().map(|g| g.genre).collect(), p.genre_names),
            copies,
            available_copies: available,
            total_copies: total,
            status,
            estimated_available_date: p.estimated_available_date,
            created_at: p.created_at,
        }
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if not_blank(title) {
        Ok(())
    } else {
        Err(ValidationError::new("required").with_message("Title is required".into()))
    }
}

fn has_duplicates(ids: &[i64]) -> bool {
    let mut seen = std::collections::HashSet::new();
    ids.iter().any(|id| !seen.insert(*id))
}

fn validate_author_ids(ids: &[i64]) -> Result<(), ValidationError> {
    if has_duplicates(ids) {
        Err(ValidationError::new("duplicate").with_message("Duplicate author selection".into()))
    } else {
        Ok(())
    }
}

fn validate_genre_ids(ids: &[i64]) -> Result<(), ValidationError> {
    if has_duplicates(ids) {
        Err(ValidationError::new("duplicate").with_message("Duplicate genre selection".into()))
    } else {
        Ok(())
    }
}

/// Field order used to pick the message shown on the book form
pub const BOOK_FORM_FIELDS: &[&str] = &["title", "author_ids", "genre_ids", "publication_year"];

/// New catalog entry (admin "Add New Book")
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, max = 9999, message = "Publication year is out of range"))]
    pub publication_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_author_ids"))]
    pub author_ids: Vec<i64>,
    #[serde(default)]
    #[validate(custom(function = "validate_genre_ids"))]
    pub genre_ids: Vec<i64>,
}

/// Partial update; only the fields present are sent to the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_title"))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, max = 9999, message = "Publication year is out of range"))]
    pub publication_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_author_ids"))]
    pub author_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_genre_ids"))]
    pub genre_ids: Option<Vec<i64>>,
}
