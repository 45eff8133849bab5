//! Credential verification.
//!
//! Login itself (sessions, cookies) lives in the API surface; this service
//! only answers "is this email/password pair good for an active account".

use tracing::debug;

use amantena_core::{CoreError, CoreResult, User};
use amantena_db::Database;

use crate::password::verify_password;

/// Service for verifying login credentials.
#[derive(Debug, Clone)]
pub struct AuthService {
    db: Database,
}

impl AuthService {
    /// Creates a new AuthService.
    pub fn new(db: Database) -> Self {
        AuthService { db }
    }

    /// Verifies an email/password pair against active users.
    ///
    /// Unknown email, wrong password, and a deactivated account all fail
    /// with the same `InvalidCredentials`; callers learn nothing about
    /// which accounts exist.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> CoreResult<User> {
        let user = self.db.users().find_by_email(email).await?;

        let Some(user) = user else {
            debug!("Login rejected: unknown email");
            return Err(CoreError::InvalidCredentials);
        };

        if !user.is_active {
            debug!(user_id = %user.id, "Login rejected: deactivated account");
            return Err(CoreError::InvalidCredentials);
        }

        if !verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "Login rejected: bad password");
            return Err(CoreError::InvalidCredentials);
        }

        Ok(user)
    }
}
