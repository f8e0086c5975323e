use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use portal_core::model::{Project, User, UserId, UserProgress};

use crate::keys;
use crate::kv::{InMemoryStore, KeyValueStore, get_json, set_json};
use crate::records::{CredentialRecord, ProgressRecord, ProjectRecord, UserRecord};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Users directory, current user, and credential hashes.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the directory cannot be read or decoded.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the directory cannot be written.
    async fn save_users(&self, users: &[User]) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the current user cannot be read or decoded.
    async fn current_user(&self) -> Result<Option<User>, StorageError>;

    /// Store the signed-in user, or clear it with `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set_current_user(&self, user: Option<&User>) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if credentials cannot be read or decoded.
    async fn credential_hash(&self, email: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if credentials cannot be written.
    async fn save_credentials(&self, credentials: &CredentialRecord) -> Result<(), StorageError>;
}

/// The whole project catalog, stored as one ordered array.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read or decoded.
    async fn list_projects(&self) -> Result<Vec<Project>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be written.
    async fn save_projects(&self, projects: &[Project]) -> Result<(), StorageError>;
}

/// Per-user progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Returns `Ok(None)` when the user has no record yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read or decoded.
    async fn get_progress(&self, user_id: &UserId) -> Result<Option<UserProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save_progress(&self, progress: &UserProgress) -> Result<(), StorageError>;
}

/// First-run flag and full reset.
#[async_trait]
pub trait MetaRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be read.
    async fn is_initialized(&self) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be written.
    async fn mark_initialized(&self) -> Result<(), StorageError>;

    /// Wipe every key, including users and the initialized flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store rejects the delete.
    async fn clear_all(&self) -> Result<(), StorageError>;
}

/// Implements every repository over one `KeyValueStore`.
#[derive(Clone)]
pub struct KvRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvRepository {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for KvRepository {
    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let records: Vec<UserRecord> = get_json(self.store.as_ref(), keys::USERS)
            .await?
            .unwrap_or_default();
        records.into_iter().map(UserRecord::into_user).collect()
    }

    async fn save_users(&self, users: &[User]) -> Result<(), StorageError> {
        let records: Vec<UserRecord> = users.iter().map(UserRecord::from_user).collect();
        set_json(self.store.as_ref(), keys::USERS, &records).await
    }

    async fn current_user(&self) -> Result<Option<User>, StorageError> {
        let record: Option<UserRecord> =
            get_json(self.store.as_ref(), keys::CURRENT_USER).await?;
        record.map(UserRecord::into_user).transpose()
    }

    async fn set_current_user(&self, user: Option<&User>) -> Result<(), StorageError> {
        match user {
            Some(user) => {
                set_json(
                    self.store.as_ref(),
                    keys::CURRENT_USER,
                    &UserRecord::from_user(user),
                )
                .await
            }
            None => self.store.remove(keys::CURRENT_USER).await,
        }
    }

    async fn credential_hash(&self, email: &str) -> Result<Option<String>, StorageError> {
        let credentials: Option<CredentialRecord> =
            get_json(self.store.as_ref(), keys::CREDENTIALS).await?;
        Ok(credentials.and_then(|mut map| map.remove(email)))
    }

    async fn save_credentials(&self, credentials: &CredentialRecord) -> Result<(), StorageError> {
        set_json(self.store.as_ref(), keys::CREDENTIALS, credentials).await
    }
}

#[async_trait]
impl ProjectRepository for KvRepository {
    async fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
        // Entries are decoded one by one so a single bad record only drops itself.
        let entries: Vec<serde_json::Value> = get_json(self.store.as_ref(), keys::PROJECTS)
            .await?
            .unwrap_or_default();
        let projects = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let decoded = serde_json::from_value::<ProjectRecord>(entry)
                    .map_err(|err| StorageError::Serialization(err.to_string()))
                    .and_then(ProjectRecord::into_project);
                match decoded {
                    Ok(project) => Some(project),
                    Err(err) => {
                        tracing::warn!(index, error = %err, "skipping unreadable project record");
                        None
                    }
                }
            })
            .collect();
        Ok(projects)
    }

    async fn save_projects(&self, projects: &[Project]) -> Result<(), StorageError> {
        let records: Vec<ProjectRecord> = projects.iter().map(ProjectRecord::from_project).collect();
        set_json(self.store.as_ref(), keys::PROJECTS, &records).await
    }
}

#[async_trait]
impl ProgressRepository for KvRepository {
    async fn get_progress(&self, user_id: &UserId) -> Result<Option<UserProgress>, StorageError> {
        let record: Option<ProgressRecord> =
            get_json(self.store.as_ref(), &keys::progress(user_id)).await?;
        Ok(record.map(|r| r.into_progress(user_id.clone())))
    }

    async fn save_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        set_json(
            self.store.as_ref(),
            &keys::progress(progress.user_id()),
            &ProgressRecord::from_progress(progress),
        )
        .await
    }
}

#[async_trait]
impl MetaRepository for KvRepository {
    async fn is_initialized(&self) -> Result<bool, StorageError> {
        Ok(self.store.get(keys::INITIALIZED).await?.as_deref() == Some("true"))
    }

    async fn mark_initialized(&self) -> Result<(), StorageError> {
        self.store.set(keys::INITIALIZED, "true".to_string()).await
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        self.store.clear().await
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub meta: Arc<dyn MetaRepository>,
}

impl Storage {
    #[must_use]
    pub fn from_store(store: Arc<dyn KeyValueStore>) -> Self {
        let repo = KvRepository::new(store);
        Self {
            users: Arc::new(repo.clone()),
            projects: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            meta: Arc::new(repo),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }
}
