use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::model::ids::{ParseIdError, ProjectId, SectionNumber, UserId};

/// UI theme preference stored alongside progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ParseIdError::for_kind("Theme")),
        }
    }
}

/// Per-user completion and unlock state.
///
/// Section 1 is unlocked for every record, including ones rebuilt from
/// storage that omit it. Unlocked sections only grow until `reset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProgress {
    user_id: UserId,
    completed: BTreeSet<ProjectId>,
    unlocked: BTreeSet<SectionNumber>,
    theme: Theme,
}

impl UserProgress {
    /// Fresh record: nothing completed, section 1 unlocked, dark theme.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            completed: BTreeSet::new(),
            unlocked: BTreeSet::from([SectionNumber::FIRST]),
            theme: Theme::default(),
        }
    }

    /// Rehydrate a record. Duplicates collapse and section 1 is re-added.
    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        completed: impl IntoIterator<Item = ProjectId>,
        unlocked: impl IntoIterator<Item = SectionNumber>,
        theme: Theme,
    ) -> Self {
        let mut unlocked: BTreeSet<SectionNumber> = unlocked.into_iter().collect();
        unlocked.insert(SectionNumber::FIRST);
        Self {
            user_id,
            completed: completed.into_iter().collect(),
            unlocked,
            theme,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeSet<ProjectId> {
        &self.completed
    }

    #[must_use]
    pub fn unlocked(&self) -> &BTreeSet<SectionNumber> {
        &self.unlocked
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    #[must_use]
    pub fn is_complete(&self, project_id: &ProjectId) -> bool {
        self.completed.contains(project_id)
    }

    #[must_use]
    pub fn is_unlocked(&self, section: SectionNumber) -> bool {
        section.is_first() || self.unlocked.contains(&section)
    }

    /// Returns `true` if the project was not already complete.
    pub fn mark_complete(&mut self, project_id: ProjectId) -> bool {
        self.completed.insert(project_id)
    }

    /// Returns `true` if the section was not already unlocked.
    pub fn unlock(&mut self, section: SectionNumber) -> bool {
        self.unlocked.insert(section)
    }

    /// Clear completions and relock everything past section 1. Theme is kept.
    pub fn reset(&mut self) {
        self.completed.clear();
        self.unlocked.clear();
        self.unlocked.insert(SectionNumber::FIRST);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(n: u32) -> SectionNumber {
        SectionNumber::new(n).unwrap()
    }

    #[test]
    fn new_record_has_first_section_unlocked() {
        let progress = UserProgress::new(UserId::new("u1"));
        assert!(progress.completed().is_empty());
        assert_eq!(
            progress.unlocked().iter().copied().collect::<Vec<_>>(),
            vec![SectionNumber::FIRST]
        );
        assert_eq!(progress.theme(), Theme::Dark);
    }

    #[test]
    fn from_persisted_dedups_and_restores_first_section() {
        let progress = UserProgress::from_persisted(
            UserId::new("u1"),
            vec![ProjectId::new("p1"), ProjectId::new("p1")],
            vec![section(3), section(3)],
            Theme::Light,
        );
        assert_eq!(progress.completed().len(), 1);
        assert!(progress.unlocked().contains(&SectionNumber::FIRST));
        assert!(progress.is_unlocked(section(3)));
        assert!(!progress.is_unlocked(section(2)));
    }

    #[test]
    fn mark_complete_reports_first_insert_only() {
        let mut progress = UserProgress::new(UserId::new("u1"));
        assert!(progress.mark_complete(ProjectId::new("p1")));
        assert!(!progress.mark_complete(ProjectId::new("p1")));
        assert!(progress.is_complete(&ProjectId::new("p1")));
    }

    #[test]
    fn reset_restores_initial_unlock_set_and_keeps_theme() {
        let mut progress = UserProgress::new(UserId::new("u1"));
        progress.set_theme(Theme::Light);
        progress.mark_complete(ProjectId::new("p1"));
        progress.unlock(section(2));
        progress.reset();

        assert!(progress.completed().is_empty());
        assert_eq!(
            progress.unlocked().iter().copied().collect::<Vec<_>>(),
            vec![SectionNumber::FIRST]
        );
        assert_eq!(progress.theme(), Theme::Light);
    }

    #[test]
    fn theme_toggles_and_parses() {
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!("LIGHT".parse::<Theme>().unwrap(), Theme::Light);
        assert!("blue".parse::<Theme>().is_err());
    }
}
