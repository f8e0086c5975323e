use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::model::ids::{ProjectId, SectionNumber};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProjectError {
    #[error("project name cannot be empty")]
    EmptyName,

    #[error("project description cannot be empty")]
    EmptyDescription,

    #[error("section must be a positive number, got {0}")]
    InvalidSection(u32),

    #[error("API endpoint is not a valid URL: {0}")]
    InvalidEndpoint(String),

    #[error("API rate limit and timeout must be > 0")]
    InvalidApiConfig,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tier of a project. Section N maps to tier N for the first three sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Easy,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Tier label shown for a section; anything past the third section is `Advanced`.
    #[must_use]
    pub fn for_section(section: SectionNumber) -> Self {
        match section.value() {
            1 => Difficulty::Easy,
            2 => Difficulty::Intermediate,
            _ => Difficulty::Advanced,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(ProjectError::UnknownDifficulty(s.to_string())),
        }
    }
}

//
// ─── API CREDENTIALS ───────────────────────────────────────────────────────────
//

/// Mock API client settings attached to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiConfig {
    pub rate_limit: u32,
    /// Milliseconds.
    pub timeout: u32,
    pub retries: u32,
}

impl ApiConfig {
    /// # Errors
    ///
    /// Returns `ProjectError::InvalidApiConfig` if rate limit or timeout is zero.
    pub fn new(rate_limit: u32, timeout: u32, retries: u32) -> Result<Self, ProjectError> {
        if rate_limit == 0 || timeout == 0 {
            return Err(ProjectError::InvalidApiConfig);
        }
        Ok(Self {
            rate_limit,
            timeout,
            retries,
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rate_limit: 100,
            timeout: 30,
            retries: 3,
        }
    }
}

/// A mock per-project API key (`sk_<part>_<part>`).
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn from_parts(first: &str, second: &str) -> Self {
        Self(format!("sk_{first}_{second}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// One bullet per character of the key.
    #[must_use]
    pub fn masked(&self) -> String {
        "•".repeat(self.0.chars().count())
    }
}

// Keys never show up in debug output.
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}

//
// ─── PROJECT ───────────────────────────────────────────────────────────────────
//

/// A learning project in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    id: ProjectId,
    name: String,
    description: String,
    difficulty: Difficulty,
    section: SectionNumber,
    section_name: String,
    device_id: String,
    hidden: bool,
    objectives: Vec<String>,
    api_key: Option<ApiKey>,
    api_key_visible: bool,
    api_endpoint: Option<String>,
    api_config: Option<ApiConfig>,
}

impl Project {
    #[must_use]
    pub fn id(&self) -> &ProjectId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn section(&self) -> SectionNumber {
        self.section
    }

    #[must_use]
    pub fn section_name(&self) -> &str {
        &self.section_name
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Hidden projects stay in the catalog but are not listed or counted.
    #[must_use]
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    #[must_use]
    pub fn objectives(&self) -> &[String] {
        &self.objectives
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    #[must_use]
    pub fn api_key_visible(&self) -> bool {
        self.api_key_visible
    }

    /// The key as it should be displayed: plain when visible, masked otherwise.
    #[must_use]
    pub fn api_key_display(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            if self.api_key_visible {
                key.as_str().to_string()
            } else {
                key.masked()
            }
        })
    }

    #[must_use]
    pub fn api_endpoint(&self) -> Option<&str> {
        self.api_endpoint.as_deref()
    }

    #[must_use]
    pub fn api_config(&self) -> Option<ApiConfig> {
        self.api_config
    }

    /// Configured API settings, falling back to defaults.
    #[must_use]
    pub fn effective_api_config(&self) -> ApiConfig {
        self.api_config.unwrap_or_default()
    }

    /// Open this project for editing. Validate the draft again to get a `Project`.
    #[must_use]
    pub fn to_draft(&self) -> ProjectDraft {
        ProjectDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            difficulty: self.difficulty,
            section: self.section.value(),
            section_name: self.section_name.clone(),
            device_id: self.device_id.clone(),
            hidden: self.hidden,
            objectives: self.objectives.clone(),
            api_key: self.api_key.clone(),
            api_key_visible: self.api_key_visible,
            api_endpoint: self.api_endpoint.clone(),
            api_config: self.api_config,
        }
    }
}

/// Unvalidated project fields, as entered in the admin form.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub section: u32,
    pub section_name: String,
    pub device_id: String,
    pub hidden: bool,
    pub objectives: Vec<String>,
    pub api_key: Option<ApiKey>,
    pub api_key_visible: bool,
    pub api_endpoint: Option<String>,
    pub api_config: Option<ApiConfig>,
}

impl Default for ProjectDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            difficulty: Difficulty::Easy,
            section: 1,
            section_name: "Basics".to_string(),
            device_id: String::new(),
            hidden: false,
            objectives: Vec::new(),
            api_key: None,
            api_key_visible: false,
            api_endpoint: None,
            api_config: None,
        }
    }
}

impl ProjectDraft {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Validate the draft and bind it to an id.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError` if name or description is blank, the section is
    /// zero, the endpoint is not a URL, or the API config is out of range.
    pub fn validate(self, id: ProjectId) -> Result<Project, ProjectError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ProjectError::EmptyName);
        }
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(ProjectError::EmptyDescription);
        }
        let section =
            SectionNumber::new(self.section).ok_or(ProjectError::InvalidSection(self.section))?;

        let api_endpoint = normalize_optional(self.api_endpoint);
        if let Some(endpoint) = api_endpoint.as_ref() {
            if Url::parse(endpoint).is_err() {
                return Err(ProjectError::InvalidEndpoint(endpoint.clone()));
            }
        }
        if let Some(config) = self.api_config {
            ApiConfig::new(config.rate_limit, config.timeout, config.retries)?;
        }

        let objectives = self
            .objectives
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        Ok(Project {
            id,
            name,
            description,
            difficulty: self.difficulty,
            section,
            section_name: self.section_name.trim().to_string(),
            device_id: self.device_id.trim().to_string(),
            hidden: self.hidden,
            objectives,
            api_key: self.api_key.filter(|key| !key.as_str().is_empty()),
            api_key_visible: self.api_key_visible,
            api_endpoint,
            api_config: self.api_config,
        })
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
