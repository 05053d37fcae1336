//! Search, filter, sort and pagination over fetched collections
//!
//! The backend returns whole collections; listing pages narrow them down in
//! the portal. Each listable record says which fields are searchable and which
//! values the category and status filters compare against.

use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Book, LoanEntry, Member, ReservationEntry};

/// Upper bound on `per_page`
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Backend order
    #[default]
    Relevance,
    /// Highest id first
    Newest,
    /// Case-insensitive title order
    Title,
}

/// Query parameters shared by every listing page
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Search text
    pub q: Option<String>,
    /// Genre, member status or loan status; "all" or empty disables the filter
    pub category: Option<String>,
    /// Display status label
    pub status: Option<String>,
    pub sort: Option<SortOrder>,
    /// 1-based page number
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// Record that can appear on a listing page
pub trait Listable {
    fn id(&self) -> i64;
    /// Text used by `sort=title`
    fn title(&self) -> &str;
    /// Fields matched by the search text
    fn search_fields(&self) -> Vec<&str>;
    /// Values matched by the category filter
    fn categories(&self) -> Vec<&str>;
    /// Label matched by the status filter
    fn status_label(&self) -> &str;
}

/// Pagination summary returned with every page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageInfo {
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub info: PageInfo,
}

/// Case and accent folding used for every comparison
pub fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// `None` when the filter value means "everything"
fn active_filter(value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    let folded = fold(value);
    if folded == "all" || folded.starts_with("all ") {
        None
    } else {
        Some(folded)
    }
}

fn matches<T: Listable>(item: &T, term: Option<&str>, category: Option<&str>, status: Option<&str>) -> bool {
    if let Some(term) = term {
        if !item.search_fields().iter().any(|f| fold(f).contains(term)) {
            return false;
        }
    }
    if let Some(category) = category {
        if !item.categories().iter().any(|c| fold(c) == category) {
            return false;
        }
    }
    if let Some(status) = status {
        if fold(item.status_label()) != status {
            return false;
        }
    }
    true
}

/// Filter, sort and slice `items` according to `query`
pub fn apply<T: Listable>(items: Vec<T>, query: &ListQuery, default_per_page: usize) -> Page<T> {
    let term = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(fold);
    let category = active_filter(query.category.as_deref());
    let status = active_filter(query.status.as_deref());

    let mut items: Vec<T> = items
        .into_iter()
        .filter(|item| matches(item, term.as_deref(), category.as_deref(), status.as_deref()))
        .collect();

    match query.sort.unwrap_or_default() {
        SortOrder::Relevance => {}
        SortOrder::Newest => items.sort_by(|a, b| b.id().cmp(&a.id())),
        SortOrder::Title => items.sort_by_cached_key(|item| fold(item.title())),
    }

    let per_page = query
        .per_page
        .unwrap_or(default_per_page)
        .clamp(1, MAX_PER_PAGE);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = query.page.unwrap_or(1).clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        info: PageInfo {
            total,
            page,
            per_page,
            total_pages,
        },
    }
}

impl Listable for Book {
    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.subtitle.as_deref());
        fields.extend(self.isbn.as_deref());
        fields.extend(self.authors.iter().map(String::as_str));
        fields
    }

    fn categories(&self) -> Vec<&str> {
        self.genres.iter().map(String::as_str).collect()
    }

    fn status_label(&self) -> &str {
        self.status.label()
    }
}

impl Listable for Member {
    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.email.as_deref());
        fields.extend(self.username.as_deref());
        fields.extend(self.code.as_deref());
        fields
    }

    fn categories(&self) -> Vec<&str> {
        vec![self.status.label()]
    }

    fn status_label(&self) -> &str {
        &self.status_label
    }
}

impl Listable for LoanEntry {
    fn id(&self) -> i64 {
        self.loan.id
    }

    fn title(&self) -> &str {
        &self.loan.book_title
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.loan.book_title.as_str(), self.loan.book_author.as_str()];
        fields.extend(self.loan.member_name.as_deref());
        fields.extend(self.loan.inventory_code.as_deref());
        fields
    }

    fn categories(&self) -> Vec<&str> {
        vec![self.display_status.label()]
    }

    fn status_label(&self) -> &str {
        &self.status_label
    }
}

impl Listable for ReservationEntry {
    fn id(&self) -> i64 {
        self.reservation.id
    }

    fn title(&self) -> &str {
        &self.reservation.book_title
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.reservation.book_title.as_str(),
            self.reservation.book_author.as_str(),
        ]
    }

    fn categories(&self) -> Vec<&str> {
        vec![self.reservation.status.label()]
    }

    fn status_label(&self) -> &str {
        &self.status_label
    }
}
