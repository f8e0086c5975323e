use std::collections::BTreeSet;

use crate::model::ids::SectionNumber;
use crate::model::project::{Difficulty, Project};

/// Number of sections the dashboard always lists, even when empty.
pub const DEFAULT_SECTION_COUNT: u32 = 3;

/// Borrowed view over the project catalog.
///
/// `all` and `visible` are kept apart on purpose: unlock checks look at every
/// project, display counts skip hidden ones.
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    projects: &'a [Project],
}

impl<'a> Catalog<'a> {
    #[must_use]
    pub fn new(projects: &'a [Project]) -> Self {
        Self { projects }
    }

    /// Every project, hidden included.
    pub fn all(self) -> impl Iterator<Item = &'a Project> + 'a {
        self.projects.iter()
    }

    /// Projects that are listed and counted.
    pub fn visible(self) -> impl Iterator<Item = &'a Project> + 'a {
        self.projects.iter().filter(|p| !p.hidden())
    }

    pub fn all_in_section(
        self,
        section: SectionNumber,
    ) -> impl Iterator<Item = &'a Project> + 'a {
        self.all().filter(move |p| p.section() == section)
    }

    pub fn visible_in_section(
        self,
        section: SectionNumber,
    ) -> impl Iterator<Item = &'a Project> + 'a {
        self.visible().filter(move |p| p.section() == section)
    }

    /// Highest section number used by any project, hidden included.
    #[must_use]
    pub fn max_section(self) -> Option<SectionNumber> {
        self.all().map(Project::section).max()
    }

    /// Distinct section numbers used by the catalog, hidden included, ascending.
    #[must_use]
    pub fn sections(self) -> BTreeSet<SectionNumber> {
        self.all().map(Project::section).collect()
    }

    /// Sections to show: the first `DEFAULT_SECTION_COUNT` plus any other
    /// section the catalog uses. Unused numbers past those are skipped.
    #[must_use]
    pub fn display_sections(self) -> Vec<SectionNumber> {
        let mut sections = self.sections();
        sections.extend((1..=DEFAULT_SECTION_COUNT).filter_map(SectionNumber::new));
        sections.into_iter().collect()
    }
}

/// Completed-of-total counter for a section or the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressCount {
    pub completed: usize,
    pub total: usize,
}

impl ProgressCount {
    #[must_use]
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Completion ratio in percent; `None` when there is nothing to count.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.completed as f64 / self.total as f64 * 100.0)
    }

    /// `percent` rounded to a whole number, 0 when empty.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rounded_percent(&self) -> u8 {
        self.percent().map_or(0, |p| p.round().clamp(0.0, 100.0) as u8)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

/// Dashboard row for one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionOverview {
    pub number: SectionNumber,
    pub difficulty: Difficulty,
    pub unlocked: bool,
    pub projects: Vec<Project>,
    pub progress: ProgressCount,
}
