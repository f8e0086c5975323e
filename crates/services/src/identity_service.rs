use std::sync::Arc;

use portal_core::model::{User, UserId};
use storage::records::CredentialRecord;
use storage::repository::{MetaRepository, UserRepository};

use crate::credentials::{hash_password, verify_password};
use crate::error::IdentityServiceError;

/// Fixed accounts written on first run: `(id, email, name, is_admin, password)`.
const SEEDED_ACCOUNTS: [(&str, &str, &str, bool, &str); 2] = [
    ("admin-001", "admin@example.com", "Admin User", true, "Admin123!"),
    ("student-001", "student@example.com", "Student", false, "Student123!"),
];

/// An authenticated user, handed explicitly to operations that need one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: User,
}

impl Session {
    pub(crate) fn new(user: User) -> Self {
        Self { user }
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        self.user.id()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

/// Resolves who is signed in and checks credentials against the seeded directory.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    meta: Arc<dyn MetaRepository>,
}

impl IdentityService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, meta: Arc<dyn MetaRepository>) -> Self {
        Self { users, meta }
    }

    /// Seed the fixed accounts unless the store is already initialized.
    ///
    /// Returns `true` if seeding happened on this call.
    ///
    /// # Errors
    ///
    /// Returns `IdentityServiceError` if hashing or persistence fails.
    pub async fn initialize_users(&self) -> Result<bool, IdentityServiceError> {
        if self.meta.is_initialized().await? {
            return Ok(false);
        }

        let mut users = Vec::with_capacity(SEEDED_ACCOUNTS.len());
        let mut credentials = CredentialRecord::new();
        for (id, email, name, is_admin, password) in SEEDED_ACCOUNTS {
            let user = User::new(UserId::new(id), email, name, is_admin)?;
            credentials.insert(email.to_string(), hash_password(password)?);
            users.push(user);
        }

        self.users.save_users(&users).await?;
        self.users.save_credentials(&credentials).await?;
        self.meta.mark_initialized().await?;
        tracing::info!(accounts = users.len(), "seeded user directory");
        Ok(true)
    }

    /// Check credentials and, on success, remember the user as signed in.
    ///
    /// Unknown email and wrong password both give `Ok(None)` and leave the
    /// current user untouched.
    ///
    /// # Errors
    ///
    /// Returns `IdentityServiceError` if seeding or storage access fails.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Session>, IdentityServiceError> {
        self.initialize_users().await?;

        let users = self.users.list_users().await?;
        let Some(user) = users.into_iter().find(|u| u.email() == email) else {
            tracing::info!("login rejected");
            return Ok(None);
        };
        let Some(hash) = self.users.credential_hash(email).await? else {
            tracing::info!("login rejected");
            return Ok(None);
        };
        if !verify_password(password, &hash) {
            tracing::info!("login rejected");
            return Ok(None);
        }

        self.users.set_current_user(Some(&user)).await?;
        tracing::info!(user_id = %user.id(), admin = user.is_admin(), "login accepted");
        Ok(Some(Session::new(user)))
    }

    /// Forget the signed-in user. Safe to call when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns `IdentityServiceError::Storage` if the store rejects the delete.
    pub async fn logout(&self) -> Result<(), IdentityServiceError> {
        self.users.set_current_user(None).await?;
        tracing::info!("logged out");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `IdentityServiceError::Storage` if the current user cannot be read.
    pub async fn current_session(&self) -> Result<Option<Session>, IdentityServiceError> {
        Ok(self.users.current_user().await?.map(Session::new))
    }

    /// # Errors
    ///
    /// Returns `IdentityServiceError::Storage` if the current user cannot be read.
    pub async fn is_authenticated(&self) -> Result<bool, IdentityServiceError> {
        Ok(self.current_session().await?.is_some())
    }

    /// # Errors
    ///
    /// Returns `IdentityServiceError::Storage` if the current user cannot be read.
    pub async fn is_admin(&self) -> Result<bool, IdentityServiceError> {
        Ok(self
            .current_session()
            .await?
            .is_some_and(|session| session.is_admin()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::Storage;

    fn service() -> IdentityService {
        let storage = Storage::in_memory();
        IdentityService::new(storage.users, storage.meta)
    }

    #[tokio::test]
    async fn seeding_happens_once() {
        let identity = service();
        assert!(identity.initialize_users().await.unwrap());
        assert!(!identity.initialize_users().await.unwrap());
        assert_eq!(identity.users.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn admin_login_succeeds_and_becomes_current() {
        let identity = service();
        let session = identity
            .login("admin@example.com", "Admin123!")
            .await
            .unwrap()
            .expect("admin accepted");
        assert_eq!(session.user_id(), &UserId::new("admin-001"));
        assert_eq!(session.user().name(), "Admin User");
        assert!(session.is_admin());
        assert_eq!(identity.current_session().await.unwrap(), Some(session));
        assert!(identity.is_admin().await.unwrap());
    }

    #[tokio::test]
    async fn wrong_password_leaves_current_user_unchanged() {
        let identity = service();
        let student = identity
            .login("student@example.com", "Student123!")
            .await
            .unwrap()
            .unwrap();

        assert!(
            identity
                .login("admin@example.com", "wrong")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(identity.current_session().await.unwrap(), Some(student));
        assert!(!identity.is_admin().await.unwrap());
    }

    #[tokio::test]
    async fn unknown_email_and_case_mismatch_are_rejected() {
        let identity = service();
        assert!(
            identity
                .login("nobody@example.com", "Admin123!")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            identity
                .login("admin@example.com", "admin123!")
                .await
                .unwrap()
                .is_none()
        );
        assert!(!identity.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn logout_is_unconditional() {
        let identity = service();
        identity.logout().await.unwrap();
        identity
            .login("student@example.com", "Student123!")
            .await
            .unwrap()
            .unwrap();
        identity.logout().await.unwrap();
        assert_eq!(identity.current_session().await.unwrap(), None);
    }
}
