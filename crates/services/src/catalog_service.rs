use std::sync::Arc;

use tokio::sync::Mutex;

use portal_core::Clock;
use portal_core::model::{ApiConfig, ApiKey, Catalog, Project, ProjectDraft, ProjectId};
use storage::repository::ProjectRepository;

use crate::error::CatalogServiceError;
use crate::generate;
use crate::identity_service::Session;

/// Reads the project catalog and applies admin edits to it.
///
/// The catalog is stored as one array, so every edit is a read-modify-write;
/// edits are serialized through `write_lock`.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    projects: Arc<dyn ProjectRepository>,
    write_lock: Arc<Mutex<()>>,
}

impl CatalogService {
    #[must_use]
    pub fn new(clock: Clock, projects: Arc<dyn ProjectRepository>) -> Self {
        Self {
            clock,
            projects,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Every project, hidden ones included.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the catalog cannot be read.
    pub async fn all_projects(&self) -> Result<Vec<Project>, CatalogServiceError> {
        Ok(self.projects.list_projects().await?)
    }

    /// Projects that students see.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the catalog cannot be read.
    pub async fn visible_projects(&self) -> Result<Vec<Project>, CatalogServiceError> {
        let projects = self.projects.list_projects().await?;
        Ok(Catalog::new(&projects).visible().cloned().collect())
    }

    /// Look up a project by id, hidden or not.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the catalog cannot be read.
    pub async fn find_project(&self, id: &ProjectId) -> Result<Option<Project>, CatalogServiceError> {
        let projects = self.projects.list_projects().await?;
        Ok(projects.into_iter().find(|p| p.id() == id))
    }

    /// Validate a draft, give it a fresh id, and append it to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` for non-admin sessions,
    /// `CatalogServiceError::Project` for validation failures, or
    /// `CatalogServiceError::Storage` if persistence fails.
    pub async fn create_project(
        &self,
        session: &Session,
        draft: ProjectDraft,
    ) -> Result<Project, CatalogServiceError> {
        require_admin(session)?;
        let _guard = self.write_lock.lock().await;

        let mut projects = self.projects.list_projects().await?;
        let id = self.fresh_id(&projects);
        let project = draft.validate(id)?;
        projects.push(project.clone());
        self.projects.save_projects(&projects).await?;

        tracing::info!(project_id = %project.id(), section = %project.section(), "project created");
        Ok(project)
    }

    /// Replace the project with the same id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::NotFound` if no project has that id,
    /// `CatalogServiceError::Forbidden` for non-admin sessions, or
    /// `CatalogServiceError::Storage` if persistence fails.
    pub async fn update_project(
        &self,
        session: &Session,
        project: Project,
    ) -> Result<Project, CatalogServiceError> {
        require_admin(session)?;
        let _guard = self.write_lock.lock().await;
        self.replace(project).await
    }

    /// Validate an edited draft against an existing id and store it.
    ///
    /// # Errors
    ///
    /// Same as `update_project`, plus `CatalogServiceError::Project` if the
    /// draft does not validate.
    pub async fn update_from_draft(
        &self,
        session: &Session,
        id: &ProjectId,
        draft: ProjectDraft,
    ) -> Result<Project, CatalogServiceError> {
        let project = draft.validate(id.clone())?;
        self.update_project(session, project).await
    }

    /// Remove a project. Returns `false` if the id was not in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` for non-admin sessions or
    /// `CatalogServiceError::Storage` if persistence fails.
    pub async fn delete_project(
        &self,
        session: &Session,
        id: &ProjectId,
    ) -> Result<bool, CatalogServiceError> {
        require_admin(session)?;
        let _guard = self.write_lock.lock().await;

        let mut projects = self.projects.list_projects().await?;
        let before = projects.len();
        projects.retain(|p| p.id() != id);
        if projects.len() == before {
            return Ok(false);
        }
        self.projects.save_projects(&projects).await?;
        tracing::info!(project_id = %id, "project deleted");
        Ok(true)
    }

    /// # Errors
    ///
    /// See `update_project`.
    pub async fn set_hidden(
        &self,
        session: &Session,
        id: &ProjectId,
        hidden: bool,
    ) -> Result<Project, CatalogServiceError> {
        self.edit(session, id, |draft| draft.hidden = hidden).await
    }

    /// Issue a new mock API key, replacing any previous one.
    ///
    /// # Errors
    ///
    /// See `update_project`.
    pub async fn generate_api_key(
        &self,
        session: &Session,
        id: &ProjectId,
    ) -> Result<ApiKey, CatalogServiceError> {
        let key = generate::api_key();
        let issued = key.clone();
        self.edit(session, id, move |draft| draft.api_key = Some(issued))
            .await?;
        tracing::info!(project_id = %id, "api key generated");
        Ok(key)
    }

    /// # Errors
    ///
    /// See `update_project`.
    pub async fn set_api_key_visible(
        &self,
        session: &Session,
        id: &ProjectId,
        visible: bool,
    ) -> Result<Project, CatalogServiceError> {
        self.edit(session, id, |draft| draft.api_key_visible = visible)
            .await
    }

    /// Set or clear (`None`) the API endpoint.
    ///
    /// # Errors
    ///
    /// See `update_project`; an unparseable URL is `CatalogServiceError::Project`.
    pub async fn set_api_endpoint(
        &self,
        session: &Session,
        id: &ProjectId,
        endpoint: Option<String>,
    ) -> Result<Project, CatalogServiceError> {
        self.edit(session, id, |draft| draft.api_endpoint = endpoint)
            .await
    }

    /// # Errors
    ///
    /// See `update_project`; a zero rate limit or timeout is `CatalogServiceError::Project`.
    pub async fn set_api_config(
        &self,
        session: &Session,
        id: &ProjectId,
        config: ApiConfig,
    ) -> Result<Project, CatalogServiceError> {
        self.edit(session, id, |draft| draft.api_config = Some(config))
            .await
    }

    async fn edit(
        &self,
        session: &Session,
        id: &ProjectId,
        change: impl FnOnce(&mut ProjectDraft) + Send,
    ) -> Result<Project, CatalogServiceError> {
        require_admin(session)?;
        let _guard = self.write_lock.lock().await;

        let projects = self.projects.list_projects().await?;
        let current = projects
            .iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| CatalogServiceError::NotFound(id.clone()))?;
        let mut draft = current.to_draft();
        change(&mut draft);
        let updated = draft.validate(id.clone())?;
        self.replace(updated).await
    }

    // Caller holds `write_lock`.
    async fn replace(&self, project: Project) -> Result<Project, CatalogServiceError> {
        let mut projects = self.projects.list_projects().await?;
        let slot = projects
            .iter_mut()
            .find(|p| p.id() == project.id())
            .ok_or_else(|| CatalogServiceError::NotFound(project.id().clone()))?;
        *slot = project.clone();
        self.projects.save_projects(&projects).await?;
        tracing::info!(project_id = %project.id(), "project updated");
        Ok(project)
    }

    fn fresh_id(&self, existing: &[Project]) -> ProjectId {
        loop {
            let id = generate::project_id(&self.clock);
            if existing.iter().all(|p| p.id() != &id) {
                return id;
            }
        }
    }
}

fn require_admin(session: &Session) -> Result<(), CatalogServiceError> {
    if session.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = %session.user_id(), "admin operation refused");
        Err(CatalogServiceError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use portal_core::model::{User, UserId};
    use portal_core::time::fixed_clock;
    use storage::repository::Storage;

    fn admin() -> Session {
        Session::new(
            User::new(UserId::new("admin-001"), "admin@example.com", "Admin User", true).unwrap(),
        )
    }

    fn student() -> Session {
        Session::new(
            User::new(UserId::new("student-001"), "student@example.com", "Student", false).unwrap(),
        )
    }

    fn service() -> CatalogService {
        CatalogService::new(fixed_clock(), Storage::in_memory().projects)
    }

    #[tokio::test]
    async fn create_assigns_id_and_defaults() {
        let catalog = service();
        let project = catalog
            .create_project(&admin(), ProjectDraft::new("Blink", "Blink an LED"))
            .await
            .unwrap();

        assert!(project.id().as_str().starts_with("proj_1700000000000_"));
        assert_eq!(project.section_name(), "Basics");
        assert!(project.api_key().is_none());
        assert!(!project.api_key_visible());
        assert_eq!(catalog.all_projects().await.unwrap(), vec![project]);
    }

    #[tokio::test]
    async fn create_rejects_blank_fields() {
        let catalog = service();
        let err = catalog
            .create_project(&admin(), ProjectDraft::new("", "desc"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogServiceError::Project(_)));
        assert!(catalog.all_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn students_cannot_edit() {
        let catalog = service();
        let err = catalog
            .create_project(&student(), ProjectDraft::new("Blink", "LED"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogServiceError::Forbidden));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let catalog = service();
        let ghost = ProjectDraft::new("Ghost", "nope")
            .validate(ProjectId::new("missing"))
            .unwrap();
        let err = catalog.update_project(&admin(), ghost).await.unwrap_err();
        assert!(matches!(err, CatalogServiceError::NotFound(id) if id.as_str() == "missing"));
    }

    #[tokio::test]
    async fn update_replaces_in_place() {
        let catalog = service();
        let first = catalog
            .create_project(&admin(), ProjectDraft::new("A", "a"))
            .await
            .unwrap();
        let second = catalog
            .create_project(&admin(), ProjectDraft::new("B", "b"))
            .await
            .unwrap();

        let mut draft = first.to_draft();
        draft.name = "A2".into();
        catalog
            .update_from_draft(&admin(), first.id(), draft)
            .await
            .unwrap();

        let names: Vec<String> = catalog
            .all_projects()
            .await
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["A2", "B"]);
        assert!(catalog.find_project(second.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_missing_is_a_noop() {
        let catalog = service();
        let project = catalog
            .create_project(&admin(), ProjectDraft::new("A", "a"))
            .await
            .unwrap();
        assert!(
            !catalog
                .delete_project(&admin(), &ProjectId::new("missing"))
                .await
                .unwrap()
        );
        assert!(catalog.delete_project(&admin(), project.id()).await.unwrap());
        assert!(catalog.find_project(project.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn hidden_projects_stay_findable() {
        let catalog = service();
        let project = catalog
            .create_project(&admin(), ProjectDraft::new("A", "a"))
            .await
            .unwrap();
        catalog
            .set_hidden(&admin(), project.id(), true)
            .await
            .unwrap();

        assert!(catalog.visible_projects().await.unwrap().is_empty());
        assert_eq!(catalog.all_projects().await.unwrap().len(), 1);
        assert!(catalog.find_project(project.id()).await.unwrap().unwrap().hidden());
    }

    #[tokio::test]
    async fn api_credentials_are_managed_per_project() {
        let catalog = service();
        let project = catalog
            .create_project(&admin(), ProjectDraft::new("A", "a"))
            .await
            .unwrap();

        let first = catalog.generate_api_key(&admin(), project.id()).await.unwrap();
        let second = catalog.generate_api_key(&admin(), project.id()).await.unwrap();
        assert_ne!(first, second);

        let shown = catalog
            .set_api_key_visible(&admin(), project.id(), true)
            .await
            .unwrap();
        assert_eq!(shown.api_key_display().as_deref(), Some(second.as_str()));

        let err = catalog
            .set_api_endpoint(&admin(), project.id(), Some("nope".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogServiceError::Project(_)));

        let configured = catalog
            .set_api_config(&admin(), project.id(), ApiConfig::new(50, 1000, 5).unwrap())
            .await
            .unwrap();
        assert_eq!(configured.effective_api_config().rate_limit, 50);
        assert_eq!(configured.api_key(), Some(&second));
    }
}
