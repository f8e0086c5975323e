//! Shared error types for the services crate.

use thiserror::Error;

use portal_core::model::{ProjectError, ProjectId, UserError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `IdentityService`.
///
/// Rejected credentials are not an error: `login` returns `Ok(None)`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityServiceError {
    #[error("password hashing failed: {0}")]
    Credential(String),
    #[error("invalid seeded account: {0}")]
    Seed(#[from] UserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("project not found: {0}")]
    NotFound(ProjectId),
    #[error("admin privileges required")]
    Forbidden,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Identity(#[from] IdentityServiceError),
}
