//! # Domain Types
//!
//! Core domain types used throughout the Amantena backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │     Invite      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  price_cents    │   │  unit_price ⚓  │   │  token (secret) │       │
//! │  │  quantity       │   │  total_cents    │   │  status         │       │
//! │  │  threshold      │   │  quantity_sold  │   │  expires_at     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ⚓ = snapshot: frozen at sale time, immune to later price edits        │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │      Role       │   │  InviteStatus   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  email (unique) │   │  Admin          │   │  Pending        │       │
//! │  │  password_hash  │   │  Staff          │   │  Accepted       │       │
//! │  │  role           │   └─────────────────┘   │  Expired        │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// Access role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full access: manage users, invites, products, and reverse sales.
    Admin,
    /// Day-to-day access: record sales, browse inventory.
    Staff,
}

impl Default for Role {
    fn default() -> Self {
        Role::Staff
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Staff => write!(f, "STAFF"),
        }
    }
}

// =============================================================================
// Invite Status
// =============================================================================

/// The stored lifecycle state of a registration invitation.
///
/// ## State Machine
/// ```text
/// PENDING --[consume: success]--> ACCEPTED  (terminal)
/// PENDING --[cancel]-----------> EXPIRED   (terminal)
/// PENDING --[clock passes expires_at]--> stays PENDING in storage, but
///           every verify/consume path treats it as expired.
/// ```
/// No transition leaves ACCEPTED or EXPIRED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum InviteStatus {
    /// Awaiting registration.
    Pending,
    /// Consumed by a successful registration.
    Accepted,
    /// Cancelled by an admin, or lazily marked after its window passed.
    Expired,
}

impl Default for InviteStatus {
    fn default() -> Self {
        InviteStatus::Pending
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InviteStatus::Pending => write!(f, "PENDING"),
            InviteStatus::Accepted => write!(f, "ACCEPTED"),
            InviteStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the farm shop inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Category label (produce, dairy, preserves, ...).
    pub category: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Units currently in stock. Never negative.
    pub quantity: i64,

    /// Reorder point: a low-stock alert fires when quantity <= threshold.
    pub threshold: i64,

    /// Whether the product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether stock has fallen to or below the reorder point.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.threshold
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale of a single product.
///
/// Created atomically with the paired stock decrement. Immutable after
/// creation except for `notes`; deleted only via explicit reversal, which
/// atomically restores the product quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,

    /// The product that was sold.
    pub product_id: String,

    /// Units sold. Always positive.
    pub quantity_sold: i64,

    /// Unit price in cents at the time of sale (snapshot, frozen).
    pub unit_price_cents: i64,

    /// quantity_sold × unit_price_cents, computed at creation and stored.
    /// Independent of later product price changes.
    pub total_cents: i64,

    /// The user who recorded the sale.
    pub user_id: String,

    /// Free-form notes. The only mutable field.
    pub notes: Option<String>,

    pub sold_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the stored total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Invite
// =============================================================================

/// A registration invitation.
///
/// Binds one secret token to one email and one role, with a fixed validity
/// window. Only `status` and `expires_at` are mutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invite {
    pub id: String,

    /// Target email, stored lowercased; compared case-insensitively.
    pub email: String,

    /// Single-use secret gating registration. Never logged.
    #[serde(skip_serializing)]
    pub token: String,

    /// Role granted to the registering user.
    pub role: Role,

    pub status: InviteStatus,

    /// The admin who sent the invitation.
    pub invited_by: String,

    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    /// Whether the validity window has passed at `now`.
    ///
    /// A PENDING invite past its expiry is invalid for verify/consume even
    /// though its stored status has not changed.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// =============================================================================
// User
// =============================================================================

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,

    /// Unique, compared case-insensitively, stored lowercased.
    pub email: String,

    /// Argon2 hash. Never serialized out.
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,

    /// Whether the account may log in (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn product(quantity: i64, threshold: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            name: "Raw Honey 500g".to_string(),
            category: "preserves".to_string(),
            price_cents: 1200,
            quantity,
            threshold,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        assert!(product(10, 10).is_low_stock());
        assert!(product(6, 10).is_low_stock());
        assert!(!product(11, 10).is_low_stock());
    }

    #[test]
    fn test_invite_expiry_is_inclusive_at_the_boundary() {
        let now = Utc::now();
        let invite = Invite {
            id: "i1".to_string(),
            email: "a@b.com".to_string(),
            token: "tok".to_string(),
            role: Role::Staff,
            status: InviteStatus::Pending,
            invited_by: "u1".to_string(),
            expires_at: now,
            created_at: now - Duration::days(7),
        };

        // now >= expires_at counts as expired
        assert!(invite.is_expired(now));
        assert!(invite.is_expired(now + Duration::seconds(1)));
        assert!(!invite.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn test_role_and_status_display() {
        assert_eq!(Role::Admin.to_string(), "ADMIN");
        assert_eq!(Role::Staff.to_string(), "STAFF");
        assert_eq!(InviteStatus::Pending.to_string(), "PENDING");
    }

    #[test]
    fn test_sale_money_accessors() {
        let sale = Sale {
            id: "s1".to_string(),
            product_id: "p1".to_string(),
            quantity_sold: 2,
            unit_price_cents: 1200,
            total_cents: 2400,
            user_id: "u1".to_string(),
            notes: None,
            sold_at: Utc::now(),
        };
        assert_eq!(sale.unit_price().cents(), 1200);
        assert_eq!(sale.total().cents(), 2400);
    }
}
