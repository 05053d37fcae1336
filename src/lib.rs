//! Library Portal
//!
//! Web front-end of the library management system: serves the member and
//! admin pages as JSON view models, talks to the library REST backend on the
//! user's behalf and keeps the browser session server-side.

use std::sync::Arc;

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod listing;
pub mod models;
pub mod services;
pub mod status;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
