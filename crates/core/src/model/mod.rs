mod ids;
mod progress;
mod project;
mod section;
mod user;

pub use ids::{ParseIdError, ProjectId, SectionNumber, UserId};

pub use progress::{Theme, UserProgress};
pub use project::{ApiConfig, ApiKey, Difficulty, Project, ProjectDraft, ProjectError};
pub use section::{Catalog, DEFAULT_SECTION_COUNT, ProgressCount, SectionOverview};
pub use user::{User, UserError};
