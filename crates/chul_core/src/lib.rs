//! Core domain logic for the community health unit registry.
//! This crate is the single source of truth for registry invariants.

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod export;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use bootstrap::{run_bootstrap, BootstrapConfig, BootstrapError, BootstrapReport};
pub use config::{AppConfig, ConfigError, LoggingConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use export::{list_export_rows, refresh_export_view, FacilityExportRow};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::catalog::{ChuService, Status};
pub use model::health_unit::{ChuContactView, CommunityHealthUnit, HealthUnitId};
pub use model::rating::ChuRating;
pub use model::registry::{Contact, ContactType, Facility};
pub use model::update_buffer::{BasicDetailsUpdate, ChuUpdateBuffer, ContactUpdate, WorkerUpdate};
pub use model::validation::ValidationError;
pub use model::worker::CommunityHealthWorker;
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::health_unit_repo::{
    HealthUnitListQuery, HealthUnitRepository, SqliteHealthUnitRepository,
};
pub use repo::rating_repo::{RatingRepository, SqliteRatingRepository};
pub use repo::registry_repo::{RegistryRepository, SqliteRegistryRepository};
pub use repo::worker_repo::{SqliteWorkerRepository, WorkerRepository};
pub use repo::{RepoError, RepoResult};
pub use service::health_unit_service::HealthUnitService;
pub use service::update_buffer_service::{
    ApplySummary, BufferError, BufferResult, UpdateBufferService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
