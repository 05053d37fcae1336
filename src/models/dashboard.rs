//! Admin dashboard models

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use utoipa::ToSchema;

/// Headline numbers on the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_books: u64,
    pub books_on_loan: u64,
    pub overdue_items: u64,
    pub total_members: u64,
}

/// Body of `GET /loans/overdue/count`
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct OverdueCount {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub count: u64,
}
