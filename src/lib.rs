//! Circulation Server
//!
//! A REST JSON API for lending books with a limited number of copies. The
//! lending ledger guarantees that a book is never held by more users than it
//! has copies, and that a user holds any given book at most once, no matter
//! how many borrow and return requests race.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire services on top of `repository`
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(
            repository,
            config.auth.clone(),
            config.ledger.clone(),
        );

        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
