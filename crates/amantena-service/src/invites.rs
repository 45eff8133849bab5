//! Invite lifecycle orchestration.
//!
//! Creation, verification, registration, resend, and cancellation of
//! single-use registration invites. State transitions and their atomicity
//! live in `amantena_db::repository::invite`; this layer adds validation,
//! token generation, password hashing, and mail dispatch.
//!
//! Mail is a hard precondition for creation: a freshly created invite
//! whose mail bounces is deleted again, so no invite row ever exists that
//! nobody was told about.

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};

use amantena_core::{
    validate_email, validate_password, validate_person_name, CoreError, CoreResult, Invite, Role,
    User,
};
use amantena_db::{Database, InvitePreview, InviteStats};

use crate::mailer::{InviteMail, InviteMailer};
use crate::password::hash_password;

/// Length of the invite token in alphanumeric characters.
///
/// 48 characters over [a-zA-Z0-9] is ~285 bits of entropy.
const TOKEN_LENGTH: usize = 48;

/// Registration form submitted against an invite token.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Service for the invite lifecycle.
#[derive(Debug, Clone)]
pub struct InviteService<M: InviteMailer> {
    db: Database,
    mailer: M,
    invite_expiry_days: i64,
    base_url: String,
}

impl<M: InviteMailer> InviteService<M> {
    /// Creates a new InviteService.
    pub fn new(db: Database, mailer: M, invite_expiry_days: i64, base_url: String) -> Self {
        InviteService {
            db,
            mailer,
            invite_expiry_days,
            base_url,
        }
    }

    /// Creates an invite and dispatches the invite mail.
    ///
    /// The invite row commits first, then the mail goes out. If dispatch
    /// fails the row is deleted again and the whole operation fails with
    /// `EmailDeliveryFailed`.
    pub async fn create_invite(
        &self,
        email: &str,
        role: Role,
        invited_by: &str,
    ) -> CoreResult<Invite> {
        validate_email(email)?;

        let token = generate_invite_token();
        let expires_at = Utc::now() + Duration::days(self.invite_expiry_days);

        let invite = self
            .db
            .invites()
            .create(email, role, invited_by, &token, expires_at)
            .await?;

        let inviter_name = self
            .db
            .users()
            .get_by_id(invited_by)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| invited_by.to_string());

        let mail = InviteMail {
            to: invite.email.clone(),
            role: invite.role,
            inviter_name,
            register_url: self.register_url(&invite.token),
        };

        if let Err(reason) = self.mailer.send_invite(&mail).await {
            warn!(
                invite_id = %invite.id,
                email = %invite.email,
                reason = %reason,
                "Invite mail failed; rolling the invite back"
            );
            // Compensating delete keeps mail a hard precondition
            self.db.invites().delete(&invite.id).await?;
            return Err(CoreError::EmailDeliveryFailed(reason));
        }

        info!(invite_id = %invite.id, email = %invite.email, "Invite created and mailed");

        Ok(invite)
    }

    /// Checks a token for the registration form. Read-only.
    pub async fn verify(&self, token: &str) -> CoreResult<InvitePreview> {
        self.db.invites().verify(token, Utc::now()).await
    }

    /// Registers a user against an invite token.
    ///
    /// Validates the form, hashes the password, and spends the invite
    /// atomically with user creation.
    pub async fn register(&self, token: &str, request: RegisterRequest) -> CoreResult<User> {
        validate_person_name(&request.name)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        let password_hash = hash_password(&request.password)?;

        let user = self
            .db
            .invites()
            .consume(
                token,
                &request.email,
                request.name.trim(),
                &password_hash,
                Utc::now(),
            )
            .await?;

        info!(user_id = %user.id, email = %user.email, "User registered via invite");

        Ok(user)
    }

    /// Resends a pending invite: refreshes its expiry and mails the same
    /// token again.
    ///
    /// The refreshed expiry stands even when the mail fails; the recipient
    /// may still hold the original link.
    pub async fn resend(&self, invite_id: &str) -> CoreResult<Invite> {
        let new_expiry = Utc::now() + Duration::days(self.invite_expiry_days);
        let invite = self.db.invites().refresh_expiry(invite_id, new_expiry).await?;

        let inviter_name = self
            .db
            .users()
            .get_by_id(&invite.invited_by)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| invite.invited_by.clone());

        let mail = InviteMail {
            to: invite.email.clone(),
            role: invite.role,
            inviter_name,
            register_url: self.register_url(&invite.token),
        };

        if let Err(reason) = self.mailer.send_invite(&mail).await {
            warn!(invite_id = %invite.id, reason = %reason, "Resend mail failed");
            return Err(CoreError::EmailDeliveryFailed(reason));
        }

        info!(invite_id = %invite.id, email = %invite.email, "Invite resent");

        Ok(invite)
    }

    /// Cancels a pending invite.
    pub async fn cancel(&self, invite_id: &str) -> CoreResult<()> {
        self.db.invites().cancel(invite_id).await
    }

    /// Lists invites, newest first.
    pub async fn list(&self, limit: u32) -> CoreResult<Vec<Invite>> {
        Ok(self.db.invites().list(limit).await?)
    }

    /// Invite counts by status for the admin overview.
    pub async fn stats(&self) -> CoreResult<InviteStats> {
        Ok(self.db.invites().status_counts().await?)
    }

    fn register_url(&self, token: &str) -> String {
        format!("{}/register?token={}", self.base_url, token)
    }
}

/// Generates a fresh invite token from the thread-local CSPRNG.
pub fn generate_invite_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
