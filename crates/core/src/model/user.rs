use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("user email cannot be empty")]
    EmptyEmail,

    #[error("user name cannot be empty")]
    EmptyName,
}

/// A portal account. Accounts are seeded once and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    email: String,
    name: String,
    is_admin: bool,
}

impl User {
    /// Creates a user record.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the email or name is empty after trimming.
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
        is_admin: bool,
    ) -> Result<Self, UserError> {
        let email = email.into().trim().to_string();
        if email.is_empty() {
            return Err(UserError::EmptyEmail);
        }
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(UserError::EmptyName);
        }

        Ok(Self {
            id,
            email,
            name,
            is_admin,
        })
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_email_and_name() {
        let user = User::new(UserId::new("u1"), " a@b.c ", " Ada ", false).unwrap();
        assert_eq!(user.email(), "a@b.c");
        assert_eq!(user.name(), "Ada");
        assert!(!user.is_admin());
    }

    #[test]
    fn rejects_blank_fields() {
        assert_eq!(
            User::new(UserId::new("u1"), " ", "Ada", false).unwrap_err(),
            UserError::EmptyEmail
        );
        assert_eq!(
            User::new(UserId::new("u1"), "a@b.c", "", true).unwrap_err(),
            UserError::EmptyName
        );
    }
}
