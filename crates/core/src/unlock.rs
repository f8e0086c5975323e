//! Section unlock rules and progress counting.
//!
//! Everything here is a pure function over a `UserProgress` and a `Catalog`;
//! loading and persisting both is the caller's job.

use crate::model::{
    Catalog, Difficulty, ProgressCount, Project, SectionNumber, SectionOverview, UserProgress,
};

/// The lowest locked section whose predecessor is fully complete.
///
/// Only sections that directly follow a section used in the catalog can
/// qualify, so candidates are the successors of the catalog's distinct
/// sections, up to the highest one, in ascending order. The predecessor is
/// judged over the full catalog, hidden projects included, and an empty
/// predecessor never unlocks anything.
#[must_use]
pub fn next_unlock(progress: &UserProgress, catalog: Catalog<'_>) -> Option<SectionNumber> {
    let last = catalog.max_section()?;

    catalog
        .sections()
        .into_iter()
        .filter_map(SectionNumber::next)
        .take_while(|candidate| *candidate <= last)
        .filter(|candidate| !progress.is_unlocked(*candidate))
        .find(|candidate| previous_section_done(progress, catalog, *candidate))
}

/// Runs `next_unlock` and records the result in `progress`.
///
/// At most one section is unlocked per call.
pub fn apply_unlock(progress: &mut UserProgress, catalog: Catalog<'_>) -> Option<SectionNumber> {
    let section = next_unlock(progress, catalog)?;
    progress.unlock(section);
    Some(section)
}

fn previous_section_done(
    progress: &UserProgress,
    catalog: Catalog<'_>,
    section: SectionNumber,
) -> bool {
    let Some(previous) = section.previous() else {
        return false;
    };
    let mut prerequisites = catalog.all_in_section(previous).peekable();
    if prerequisites.peek().is_none() {
        return false;
    }
    prerequisites.all(|p| progress.is_complete(p.id()))
}

/// Completed vs. total over the visible projects of one section.
#[must_use]
pub fn section_progress(
    progress: &UserProgress,
    catalog: Catalog<'_>,
    section: SectionNumber,
) -> ProgressCount {
    count(progress, catalog.visible_in_section(section))
}

/// Completed vs. total over every visible project.
#[must_use]
pub fn overall_progress(progress: &UserProgress, catalog: Catalog<'_>) -> ProgressCount {
    count(progress, catalog.visible())
}

fn count<'a>(
    progress: &UserProgress,
    projects: impl Iterator<Item = &'a Project>,
) -> ProgressCount {
    let mut tally = ProgressCount::default();
    for project in projects {
        tally.total += 1;
        if progress.is_complete(project.id()) {
            tally.completed += 1;
        }
    }
    tally
}

/// One row per displayed section, with lock state and visible projects.
#[must_use]
pub fn overview(progress: &UserProgress, catalog: Catalog<'_>) -> Vec<SectionOverview> {
    catalog
        .display_sections()
        .into_iter()
        .map(|number| SectionOverview {
            number,
            difficulty: Difficulty::for_section(number),
            unlocked: progress.is_unlocked(number),
            projects: catalog.visible_in_section(number).cloned().collect(),
            progress: section_progress(progress, catalog, number),
        })
        .collect()
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
