//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, catalog, health, loans, reservations};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Portal",
        version = "0.3.0",
        description = "Page data served by the library portal. Pages are authenticated by the session cookie set at login.",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login_page,
        auth::login,
        auth::register,
        auth::logout,
        auth::current_session,
        // Catalog
        catalog::homepage,
        catalog::list_books,
        catalog::book_detail,
        catalog::borrow_book,
        catalog::reserve_book,
        // Loans
        loans::my_loans,
        loans::renew_loan,
        // Reservations
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::cancel_reservation,
        // Admin
        admin::dashboard,
        admin::list_catalog,
        admin::create_book,
        admin::get_book,
        admin::update_book,
        admin::delete_book,
        admin::list_members,
        admin::get_member,
        admin::update_member_status,
        admin::delete_member,
        admin::lookup_return,
        admin::confirm_return,
    ),
    components(
        schemas(
            // Auth
            auth::LoginPage,
            auth::LoginResponse,
            auth::RegisterResponse,
            auth::LogoutResponse,
            auth::SessionResponse,
            crate::models::user::LoginRequest,
            crate::models::user::RegisterForm,
            crate::models::user::SessionUser,
            crate::models::user::Role,
            // Catalog
            catalog::HomePage,
            catalog::CategoryCount,
            catalog::BooksPage,
            catalog::DateWindow,
            catalog::BookDetailPage,
            catalog::BorrowForm,
            catalog::BorrowResponse,
            catalog::ReserveForm,
            catalog::ReserveResponse,
            crate::models::book::Book,
            crate::models::book::BookCopy,
            crate::models::book::CopyStatus,
            crate::models::book::CreateBookRequest,
            crate::models::book::UpdateBookRequest,
            crate::status::BookStatus,
            crate::listing::PageInfo,
            crate::listing::SortOrder,
            // Loans
            loans::MyLoansPage,
            loans::RenewResponse,
            crate::models::loan::Loan,
            crate::models::loan::LoanEntry,
            crate::models::loan::LoanStatus,
            crate::status::LoanDisplayStatus,
            // Reservations
            reservations::ReservationsPage,
            reservations::CancelResponse,
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationEntry,
            crate::models::reservation::ReservationStatus,
            crate::models::reservation::ReservationStats,
            // Admin
            admin::CatalogPage,
            admin::MembersPage,
            admin::MemberStatusForm,
            admin::MemberStatusResponse,
            admin::ReturnLookup,
            admin::ReturnConfirmation,
            crate::models::dashboard::DashboardStats,
            crate::models::member::Member,
            crate::models::member::MemberStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login, registration and session state"),
        (name = "catalog", description = "Member catalog, borrowing and reservations"),
        (name = "loans", description = "Member loans"),
        (name = "reservations", description = "Member reservations"),
        (name = "admin", description = "Admin console")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
