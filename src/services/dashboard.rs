//! Admin dashboard aggregation

use crate::{
    error::AppResult,
    models::{Book, DashboardStats},
    services::{books::BooksService, loans::LoansService, members::MembersService},
};

#[derive(Clone)]
pub struct DashboardService {
    books: BooksService,
    members: MembersService,
    loans: LoansService,
}

/// Copies currently out, summed over every title
pub fn books_on_loan(books: &[Book]) -> u64 {
    books
        .iter()
        .map(|b| u64::from(b.total_copies.saturating_sub(b.available_copies)))
        .sum()
}

impl DashboardService {
    pub fn new(books: BooksService, members: MembersService, loans: LoansService) -> Self {
        Self { books, members, loans }
    }

    /// Books and members are fetched concurrently; the overdue count is optional
    pub async fn stats(&self, token: &str) -> AppResult<DashboardStats> {
        let (books, members) = tokio::try_join!(self.books.list(token), self.members.list(token))?;

        let overdue_items = match self.loans.overdue_count(token).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Overdue count unavailable: {}", e);
                0
            }
        };

        Ok(DashboardStats {
            total_books: books.len() as u64,
            books_on_loan: books_on_loan(&books),
            overdue_items,
            total_members: members.len() as u64,
        })
    }
}
