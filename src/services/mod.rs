//! Portal services: backend workflows and session handling

pub mod auth;
pub mod books;
pub mod dashboard;
pub mod loans;
pub mod members;
pub mod reservations;
pub mod sessions;

use crate::client::ApiClient;
use sessions::SessionManager;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub books: books::BooksService,
    pub loans: loans::LoansService,
    pub reservations: reservations::ReservationsService,
    pub members: members::MembersService,
    pub dashboard: dashboard::DashboardService,
    pub sessions: SessionManager,
}

impl Services {
    /// Create all services on top of one backend client
    pub fn new(client: ApiClient, sessions: SessionManager) -> Self {
        let books = books::BooksService::new(client.clone());
        let loans = loans::LoansService::new(client.clone());
        let members = members::MembersService::new(client.clone());

        Self {
            auth: auth::AuthService::new(client.clone(), sessions.clone()),
            dashboard: dashboard::DashboardService::new(books.clone(), members.clone(), loans.clone()),
            reservations: reservations::ReservationsService::new(client),
            books,
            loans,
            members,
            sessions,
        }
    }
}
