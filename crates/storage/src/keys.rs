//! Key layout of the portal store. Everything lives under the `iot:` namespace.

use portal_core::model::UserId;

pub const USERS: &str = "iot:users";
pub const CURRENT_USER: &str = "iot:currentUser";
pub const PROJECTS: &str = "iot:projects";
pub const INITIALIZED: &str = "iot:initialized";
pub const CREDENTIALS: &str = "iot:credentials";

const PROGRESS_PREFIX: &str = "iot:progress:";

#[must_use]
pub fn progress(user_id: &UserId) -> String {
    format!("{PROGRESS_PREFIX}{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_key_is_namespaced_per_user() {
        assert_eq!(progress(&UserId::new("student-001")), "iot:progress:student-001");
    }
}
