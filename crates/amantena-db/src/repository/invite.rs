//! # Invite Repository
//!
//! Storage for the invite lifecycle: single-use, expiring onboarding tokens.
//!
//! ## Lifecycle
//! ```text
//!                 create()
//!                    │
//!                    ▼
//!               ┌─────────┐   consume()   ┌──────────┐
//!               │ PENDING ├──────────────►│ ACCEPTED │  (terminal)
//!               └────┬────┘               └──────────┘
//!                    │ cancel(), or lazily on create()
//!                    │ after the wall clock passes expires_at
//!                    ▼
//!               ┌─────────┐
//!               │ EXPIRED │  (terminal)
//!               └─────────┘
//! ```
//!
//! Expiry is evaluated against the clock at read time; a PENDING row whose
//! `expires_at` has passed behaves as expired everywhere even before any
//! write flips its stored status.
//!
//! Two guards make the lifecycle race-safe:
//! - a partial unique index on `email WHERE status = 'PENDING'` means two
//!   concurrent creates for one email cannot both insert;
//! - `consume` flips PENDING → ACCEPTED with a guarded UPDATE inside the
//!   same transaction that inserts the user, so a token is spent exactly
//!   once.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use amantena_core::{normalize_email, CoreError, CoreResult, Invite, InviteStatus, Role, User};

/// What a prospective user may see about an invite before registering.
///
/// Deliberately narrow: no IDs, no timestamps, no token echo.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InvitePreview {
    pub email: String,
    pub role: Role,
    pub inviter_name: String,
}

/// Counts of invites by status, for the admin overview.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InviteStats {
    pub pending: i64,
    pub accepted: i64,
    pub expired: i64,
}

/// Repository for invite database operations.
#[derive(Debug, Clone)]
pub struct InviteRepository {
    pool: SqlitePool,
}

impl InviteRepository {
    /// Creates a new InviteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InviteRepository { pool }
    }

    /// Creates an invite for `email` with the given token and expiry.
    ///
    /// ## Failure Order
    /// 1. `Conflict` - a user with that email already exists
    /// 2. `Conflict` - a live (non-expired) PENDING invite already exists
    ///
    /// An expired-but-still-PENDING invite for the email is flipped to
    /// EXPIRED inside this transaction, which frees the partial unique
    /// index for the new row.
    pub async fn create(
        &self,
        email: &str,
        role: Role,
        invited_by: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> CoreResult<Invite> {
        let email = normalize_email(email);
        let now = Utc::now();

        debug!(email = %email, role = %role, "Creating invite");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let existing_user: Option<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE email = ?1")
                .bind(&email)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;

        if existing_user.is_some() {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(CoreError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let pending = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, email, token, role, status, invited_by, expires_at, created_at
            FROM invites
            WHERE email = ?1 AND status = ?2
            "#,
        )
        .bind(&email)
        .bind(InviteStatus::Pending)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if let Some(pending) = pending {
            if pending.is_expired(now) {
                // Dead row holding the unique slot; retire it and move on.
                sqlx::query("UPDATE invites SET status = ?2 WHERE id = ?1")
                    .bind(&pending.id)
                    .bind(InviteStatus::Expired)
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::from)?;
            } else {
                tx.rollback().await.map_err(DbError::from)?;
                return Err(CoreError::Conflict(
                    "An invite for this email is already pending".to_string(),
                ));
            }
        }

        let invite = Invite {
            id: Uuid::new_v4().to_string(),
            email,
            token: token.to_string(),
            role,
            status: InviteStatus::Pending,
            invited_by: invited_by.to_string(),
            expires_at,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO invites (
                id, email, token, role, status, invited_by, expires_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&invite.id)
        .bind(&invite.email)
        .bind(&invite.token)
        .bind(invite.role)
        .bind(invite.status)
        .bind(&invite.invited_by)
        .bind(invite.expires_at)
        .bind(invite.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            // Lost the race against a concurrent create for the same email
            DbError::UniqueViolation { .. } => CoreError::Conflict(
                "An invite for this email is already pending".to_string(),
            ),
            other => CoreError::from(other),
        })?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(invite_id = %invite.id, "Invite created");

        Ok(invite)
    }

    /// Looks up an invite by its token.
    pub async fn find_by_token(&self, token: &str) -> DbResult<Option<Invite>> {
        let invite = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, email, token, role, status, invited_by, expires_at, created_at
            FROM invites
            WHERE token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invite)
    }

    /// Gets an invite by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invite>> {
        let invite = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, email, token, role, status, invited_by, expires_at, created_at
            FROM invites
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invite)
    }

    /// Checks a token and returns what the registration form may display.
    ///
    /// Read-only: verifying never spends or mutates the invite.
    ///
    /// ## Failure Order
    /// 1. `InviteNotFound` - no such token
    /// 2. `InviteAlreadyUsed` - any terminal stored status (ACCEPTED, or
    ///    EXPIRED via cancellation)
    /// 3. `InviteExpired` - still PENDING but the clock has passed
    ///    `expires_at`
    pub async fn verify(&self, token: &str, now: DateTime<Utc>) -> CoreResult<InvitePreview> {
        let row = sqlx::query_as::<_, VerifyRow>(
            r#"
            SELECT i.email, i.role, i.status, i.expires_at,
                   u.name AS inviter_name
            FROM invites i
            INNER JOIN users u ON u.id = i.invited_by
            WHERE i.token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        let row = row.ok_or(CoreError::InviteNotFound)?;

        // Any terminal stored status reads as spent; "expired" is reserved
        // for a live invite whose window has passed.
        if row.status != InviteStatus::Pending {
            return Err(CoreError::InviteAlreadyUsed);
        }
        if now >= row.expires_at {
            return Err(CoreError::InviteExpired);
        }

        Ok(InvitePreview {
            email: row.email,
            role: row.role,
            inviter_name: row.inviter_name,
        })
    }

    /// Spends an invite: creates the user and marks the invite ACCEPTED,
    /// atomically.
    ///
    /// ## Failure Order
    /// 1. `InviteNotFound` / `InviteAlreadyUsed` / `InviteExpired` - as
    ///    [`verify`](Self::verify)
    /// 2. `EmailMismatch` - submitted email differs from the invited one
    /// 3. `Conflict` - a user with that email already exists
    ///
    /// The PENDING → ACCEPTED flip is a guarded UPDATE; if another consume
    /// of the same token commits first, this one sees zero rows affected
    /// and fails with `InviteAlreadyUsed` instead of creating a second
    /// user.
    pub async fn consume(
        &self,
        token: &str,
        email: &str,
        name: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<User> {
        let email = normalize_email(email);

        debug!(email = %email, "Consuming invite");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let invite = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, email, token, role, status, invited_by, expires_at, created_at
            FROM invites
            WHERE token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let Some(invite) = invite else {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(CoreError::InviteNotFound);
        };

        let failure = match invite.status {
            InviteStatus::Accepted | InviteStatus::Expired => Some(CoreError::InviteAlreadyUsed),
            InviteStatus::Pending if invite.is_expired(now) => Some(CoreError::InviteExpired),
            InviteStatus::Pending if invite.email != email => Some(CoreError::EmailMismatch),
            InviteStatus::Pending => None,
        };
        if let Some(err) = failure {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(err);
        }

        let existing_user: Option<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE email = ?1")
                .bind(&email)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;

        if existing_user.is_some() {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(CoreError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email,
            password_hash: password_hash.to_string(),
            // The role was fixed at invite time; registration can't change it
            role: invite.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        // Guarded flip: only succeeds if the invite is still PENDING.
        let flipped = sqlx::query(
            r#"
            UPDATE invites
            SET status = ?2
            WHERE id = ?1 AND status = ?3
            "#,
        )
        .bind(&invite.id)
        .bind(InviteStatus::Accepted)
        .bind(InviteStatus::Pending)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if flipped.rows_affected() == 0 {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(CoreError::InviteAlreadyUsed);
        }

        tx.commit().await.map_err(DbError::from)?;

        debug!(user_id = %user.id, invite_id = %invite.id, "Invite consumed");

        Ok(user)
    }

    /// Pushes a pending invite's expiry forward (resend).
    ///
    /// ## Returns
    /// The updated invite.
    pub async fn refresh_expiry(
        &self,
        id: &str,
        new_expiry: DateTime<Utc>,
    ) -> CoreResult<Invite> {
        let invite = self.get_by_id(id).await?.ok_or(CoreError::InviteNotFound)?;

        if invite.status != InviteStatus::Pending {
            return Err(CoreError::InviteNotPending {
                status: invite.status,
            });
        }

        sqlx::query("UPDATE invites SET expires_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(new_expiry)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(Invite {
            expires_at: new_expiry,
            ..invite
        })
    }

    /// Cancels a pending invite by expiring it immediately.
    pub async fn cancel(&self, id: &str) -> CoreResult<()> {
        let invite = self.get_by_id(id).await?.ok_or(CoreError::InviteNotFound)?;

        if invite.status != InviteStatus::Pending {
            return Err(CoreError::InviteNotPending {
                status: invite.status,
            });
        }

        sqlx::query("UPDATE invites SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(InviteStatus::Expired)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        debug!(invite_id = %id, "Invite cancelled");

        Ok(())
    }

    /// Hard-deletes an invite row.
    ///
    /// Used to roll back a freshly created invite whose email never went
    /// out; not part of the normal lifecycle.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invites WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invite", id));
        }

        Ok(())
    }

    /// Lists invites, newest first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Invite>> {
        let invites = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, email, token, role, status, invited_by, expires_at, created_at
            FROM invites
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(invites)
    }

    /// Counts invites per stored status.
    ///
    /// Counts go by the stored column, so a PENDING row past its expiry
    /// still counts as pending until something flips it.
    pub async fn status_counts(&self) -> DbResult<InviteStats> {
        let rows: Vec<(InviteStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM invites GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = InviteStats::default();
        for (status, count) in rows {
            match status {
                InviteStatus::Pending => stats.pending = count,
                InviteStatus::Accepted => stats.accepted = count,
                InviteStatus::Expired => stats.expired = count,
            }
        }

        Ok(stats)
    }
}

#[derive(sqlx::FromRow)]
struct VerifyRow {
    email: String,
    role: Role,
    status: InviteStatus,
    expires_at: DateTime<Utc>,
    inviter_name: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
