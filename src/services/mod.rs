//! Business logic services

pub mod availability;
pub mod catalog;
pub mod ledger;
pub mod users;

use crate::{
    config::{AuthConfig, LedgerConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub ledger: ledger::LedgerService,
    pub availability: availability::AvailabilityService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, ledger_config: LedgerConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            ledger: ledger::LedgerService::new(repository.clone(), ledger_config),
            availability: availability::AvailabilityService::new(repository.clone()),
            users: users::UsersService::new(repository, auth_config),
        }
    }
}
