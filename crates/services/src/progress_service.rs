use std::sync::Arc;

use tokio::sync::Mutex;

use portal_core::model::{
    Catalog, ProgressCount, Project, ProjectId, SectionNumber, SectionOverview, Theme, UserId,
    UserProgress,
};
use portal_core::unlock;
use storage::repository::{ProgressRepository, ProjectRepository};

use crate::error::ProgressServiceError;

/// Tracks completions per user and unlocks sections as they fill up.
///
/// Every mutation loads the record, applies the change in memory and writes
/// it back while holding `write_lock`, so concurrent completions for the same
/// user cannot drop each other's updates.
#[derive(Clone)]
pub struct ProgressService {
    projects: Arc<dyn ProjectRepository>,
    progress: Arc<dyn ProgressRepository>,
    write_lock: Arc<Mutex<()>>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            projects,
            progress,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The stored record, or a fresh one if the user has none yet.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the record cannot be read.
    pub async fn progress(&self, user_id: &UserId) -> Result<UserProgress, ProgressServiceError> {
        Ok(self
            .progress
            .get_progress(user_id)
            .await?
            .unwrap_or_else(|| UserProgress::new(user_id.clone())))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the record cannot be read.
    pub async fn is_complete(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
    ) -> Result<bool, ProgressServiceError> {
        Ok(self.progress(user_id).await?.is_complete(project_id))
    }

    /// Mark a project complete and unlock the next section if it qualifies.
    ///
    /// Returns the section unlocked by this call, if any. The project id is
    /// not checked against the catalog. Completing an already complete
    /// project still re-evaluates unlocks.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn complete(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
    ) -> Result<Option<SectionNumber>, ProgressServiceError> {
        let _guard = self.write_lock.lock().await;

        let mut progress = self.progress(user_id).await?;
        let newly_completed = progress.mark_complete(project_id.clone());

        let projects = self.projects.list_projects().await?;
        let unlocked = unlock::apply_unlock(&mut progress, Catalog::new(&projects));

        self.progress.save_progress(&progress).await?;

        if newly_completed {
            tracing::debug!(user_id = %user_id, project_id = %project_id, "project completed");
        }
        if let Some(section) = unlocked {
            tracing::info!(user_id = %user_id, section = %section, "section unlocked");
        }
        Ok(unlocked)
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the record or catalog cannot be read.
    pub async fn section_progress(
        &self,
        user_id: &UserId,
        section: SectionNumber,
    ) -> Result<ProgressCount, ProgressServiceError> {
        let progress = self.progress(user_id).await?;
        let projects = self.projects.list_projects().await?;
        Ok(unlock::section_progress(
            &progress,
            Catalog::new(&projects),
            section,
        ))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the record or catalog cannot be read.
    pub async fn overall_progress(
        &self,
        user_id: &UserId,
    ) -> Result<ProgressCount, ProgressServiceError> {
        let progress = self.progress(user_id).await?;
        let projects = self.projects.list_projects().await?;
        Ok(unlock::overall_progress(&progress, Catalog::new(&projects)))
    }

    /// Clear completions and relock sections past the first. The theme survives.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn reset(&self, user_id: &UserId) -> Result<UserProgress, ProgressServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut progress = self.progress(user_id).await?;
        progress.reset();
        self.progress.save_progress(&progress).await?;
        tracing::info!(user_id = %user_id, "progress reset");
        Ok(progress)
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the record cannot be read.
    pub async fn is_section_unlocked(
        &self,
        user_id: &UserId,
        section: SectionNumber,
    ) -> Result<bool, ProgressServiceError> {
        Ok(self.progress(user_id).await?.is_unlocked(section))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn set_theme(&self, user_id: &UserId, theme: Theme) -> Result<(), ProgressServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut progress = self.progress(user_id).await?;
        progress.set_theme(theme);
        self.progress.save_progress(&progress).await?;
        Ok(())
    }

    /// Flip between light and dark and return the new theme.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn toggle_theme(&self, user_id: &UserId) -> Result<Theme, ProgressServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut progress = self.progress(user_id).await?;
        let theme = progress.theme().toggled();
        progress.set_theme(theme);
        self.progress.save_progress(&progress).await?;
        Ok(theme)
    }

    /// One row per section for the student dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the record or catalog cannot be read.
    pub async fn dashboard(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SectionOverview>, ProgressServiceError> {
        let progress = self.progress(user_id).await?;
        let projects = self.projects.list_projects().await?;
        Ok(unlock::overview(&progress, Catalog::new(&projects)))
    }

    /// Visible projects of a section, or `None` while the section is locked.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the record or catalog cannot be read.
    pub async fn section_projects(
        &self,
        user_id: &UserId,
        section: SectionNumber,
    ) -> Result<Option<Vec<Project>>, ProgressServiceError> {
        let progress = self.progress(user_id).await?;
        if !progress.is_unlocked(section) {
            return Ok(None);
        }
        let projects = self.projects.list_projects().await?;
        Ok(Some(
            Catalog::new(&projects)
                .visible_in_section(section)
                .cloned()
                .collect(),
        ))
    }
}
