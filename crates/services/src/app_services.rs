use std::sync::Arc;

use storage::repository::{MetaRepository, Storage};

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::identity_service::IdentityService;
use crate::progress_service::ProgressService;

/// Assembles the portal services over one storage backend and seeds it.
#[derive(Clone)]
pub struct AppServices {
    meta: Arc<dyn MetaRepository>,
    identity: Arc<IdentityService>,
    catalog: Arc<CatalogService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or account seeding fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock).await
    }

    /// Build services over a process-local store. Nothing survives the process.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if account seeding fails.
    pub async fn in_memory(clock: Clock) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock).await
    }

    /// # Errors
    ///
    /// Returns `AppServicesError` if account seeding fails.
    pub async fn from_storage(storage: Storage, clock: Clock) -> Result<Self, AppServicesError> {
        let identity = Arc::new(IdentityService::new(
            Arc::clone(&storage.users),
            Arc::clone(&storage.meta),
        ));
        let catalog = Arc::new(CatalogService::new(clock, Arc::clone(&storage.projects)));
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.projects),
            Arc::clone(&storage.progress),
        ));

        identity.initialize_users().await?;

        Ok(Self {
            meta: storage.meta,
            identity,
            catalog,
            progress,
        })
    }

    #[must_use]
    pub fn identity(&self) -> Arc<IdentityService> {
        Arc::clone(&self.identity)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    /// Wipe every portal key and seed the fixed accounts again.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if clearing or reseeding fails.
    pub async fn reset_store(&self) -> Result<(), AppServicesError> {
        self.meta.clear_all().await?;
        self.identity.initialize_users().await?;
        tracing::warn!("portal store wiped and reseeded");
        Ok(())
    }
}
