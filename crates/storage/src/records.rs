//! JSON shapes written to the store.
//!
//! Field names follow the camelCase layout the portal has always used, so a
//! store written by an older client still loads. Domain types never derive
//! these; conversion happens here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use portal_core::model::{
    ApiConfig, ApiKey, Difficulty, Project, ProjectDraft, ProjectId, SectionNumber, Theme, User,
    UserId, UserProgress,
};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl UserRecord {
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            email: user.email().to_string(),
            name: user.name().to_string(),
            is_admin: user.is_admin(),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored user is invalid.
    pub fn into_user(self) -> Result<User, StorageError> {
        User::new(UserId::new(self.id), self.email, self.name, self.is_admin).map_err(ser)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfigRecord {
    pub rate_limit: u32,
    pub timeout: u32,
    pub retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub section: u32,
    #[serde(default)]
    pub section_name: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_config: Option<ApiConfigRecord>,
}

impl ProjectRecord {
    #[must_use]
    pub fn from_project(project: &Project) -> Self {
        Self {
            id: project.id().to_string(),
            name: project.name().to_string(),
            description: project.description().to_string(),
            difficulty: project.difficulty(),
            section: project.section().value(),
            section_name: project.section_name().to_string(),
            device_id: project.device_id().to_string(),
            hidden: project.hidden(),
            objectives: project.objectives().to_vec(),
            api_key: project.api_key().map(|key| key.as_str().to_string()),
            api_key_visible: Some(project.api_key_visible()),
            api_endpoint: project.api_endpoint().map(str::to_string),
            api_config: project.api_config().map(|c| ApiConfigRecord {
                rate_limit: c.rate_limit,
                timeout: c.timeout,
                retries: c.retries,
            }),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored project fails validation.
    pub fn into_project(self) -> Result<Project, StorageError> {
        let id = ProjectId::new(self.id);
        ProjectDraft {
            name: self.name,
            description: self.description,
            difficulty: self.difficulty,
            section: self.section,
            section_name: self.section_name,
            device_id: self.device_id,
            hidden: self.hidden,
            objectives: self.objectives,
            api_key: self.api_key.map(ApiKey::new),
            api_key_visible: self.api_key_visible.unwrap_or(false),
            api_endpoint: self.api_endpoint,
            api_config: self.api_config.map(|c| ApiConfig {
                rate_limit: c.rate_limit,
                timeout: c.timeout,
                retries: c.retries,
            }),
        }
        .validate(id.clone())
        .map_err(|err| StorageError::Serialization(format!("project {id}: {err}")))
    }
}

fn default_unlocked() -> Vec<u32> {
    vec![1]
}

/// Stored progress: the two sets flattened to arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub completed_projects: Vec<String>,
    #[serde(default = "default_unlocked")]
    pub unlocked_sections: Vec<u32>,
    #[serde(default)]
    pub theme: Theme,
}

impl ProgressRecord {
    #[must_use]
    pub fn from_progress(progress: &UserProgress) -> Self {
        Self {
            completed_projects: progress
                .completed()
                .iter()
                .map(ToString::to_string)
                .collect(),
            unlocked_sections: progress
                .unlocked()
                .iter()
                .map(|section| section.value())
                .collect(),
            theme: progress.theme(),
        }
    }

    /// Rebuild the domain record. Duplicates collapse; zero sections are dropped.
    #[must_use]
    pub fn into_progress(self, user_id: UserId) -> UserProgress {
        UserProgress::from_persisted(
            user_id,
            self.completed_projects.into_iter().map(ProjectId::new),
            self.unlocked_sections
                .into_iter()
                .filter_map(SectionNumber::new),
            self.theme,
        )
    }
}

/// Email to password-hash map.
pub type CredentialRecord = BTreeMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_record_uses_camel_case_fields() {
        let mut draft = ProjectDraft::new("Blink", "LED");
        draft.device_id = "device-001".into();
        draft.api_config = Some(ApiConfig::default());
        let project = draft.validate(ProjectId::new("p1")).unwrap();

        let json = serde_json::to_value(ProjectRecord::from_project(&project)).unwrap();
        assert_eq!(json["deviceId"], "device-001");
        assert_eq!(json["sectionName"], "Basics");
        assert_eq!(json["difficulty"], "Easy");
        assert_eq!(json["apiKeyVisible"], false);
        assert_eq!(json["apiConfig"]["rateLimit"], 100);
        assert!(json.get("apiKey").is_none());
    }

    #[test]
    fn project_record_loads_minimal_legacy_shape() {
        let raw = r#"{"id":"p1","name":"Blink","description":"LED","difficulty":"Advanced","section":3}"#;
        let record: ProjectRecord = serde_json::from_str(raw).unwrap();
        let project = record.into_project().unwrap();
        assert_eq!(project.section().value(), 3);
        assert_eq!(project.difficulty(), Difficulty::Advanced);
        assert!(!project.hidden());
        assert!(!project.api_key_visible());
    }

    #[test]
    fn invalid_project_record_is_a_serialization_error() {
        let raw = r#"{"id":"p1","name":"","description":"LED","difficulty":"Easy","section":1}"#;
        let record: ProjectRecord = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            record.into_project(),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn progress_record_defaults_missing_fields() {
        let record: ProgressRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.unlocked_sections, vec![1]);
        assert!(record.completed_projects.is_empty());
        assert_eq!(record.theme, Theme::Dark);
    }

    #[test]
    fn progress_record_dedups_on_read() {
        let raw = r#"{"completedProjects":["p1","p1","p2"],"unlockedSections":[2,2,0],"theme":"light"}"#;
        let record: ProgressRecord = serde_json::from_str(raw).unwrap();
        let progress = record.into_progress(UserId::new("u1"));

        assert_eq!(progress.completed().len(), 2);
        assert_eq!(
            progress
                .unlocked()
                .iter()
                .map(|s| s.value())
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(progress.theme(), Theme::Light);
    }

    #[test]
    fn progress_record_writes_sorted_arrays() {
        let mut progress = UserProgress::new(UserId::new("u1"));
        progress.mark_complete(ProjectId::new("b"));
        progress.mark_complete(ProjectId::new("a"));
        let json = serde_json::to_string(&ProgressRecord::from_progress(&progress)).unwrap();
        assert_eq!(
            json,
            r#"{"completedProjects":["a","b"],"unlockedSections":[1],"theme":"dark"}"#
        );
    }
}
