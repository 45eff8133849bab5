//! # Error Types
//!
//! Domain-specific error types for amantena-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  amantena-core errors (this file)                                      │
//! │  ├── CoreError        - Domain failures (stock, invites, conflicts)    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  amantena-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ← DbError ; API layer maps          │
//! │  CoreError variants to user-facing status codes.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, available stock, ...)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::types::InviteStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// The API layer translates them into user-facing responses; nothing in this
/// workspace swallows them.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found, or it has been deactivated (soft delete).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Invitation token or ID does not match any invite.
    #[error("Invitation not found")]
    InviteNotFound,

    /// Requested sale quantity exceeds available stock.
    ///
    /// Carries the actual available quantity so callers can report it
    /// ("Only 5 units available").
    #[error("Insufficient stock for {product}: only {available} units available, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A duplicate user or invite creation was attempted.
    #[error("{0}")]
    Conflict(String),

    /// The invitation has already been consumed or otherwise left the
    /// PENDING state (including cancellation).
    #[error("This invitation has already been used")]
    InviteAlreadyUsed,

    /// An invite management operation (resend/cancel) was attempted on an
    /// invite that is no longer pending.
    #[error("Invitation is {status}, only pending invitations can be modified")]
    InviteNotPending { status: InviteStatus },

    /// The invitation's validity window has passed.
    #[error("This invitation has expired")]
    InviteExpired,

    /// The registering email does not match the invitation's target email.
    #[error("Email does not match the invitation")]
    EmailMismatch,

    /// The invitation email could not be delivered. The invite row has been
    /// rolled back by the time this error is returned.
    #[error("Failed to send invitation email: {0}")]
    EmailDeliveryFailed(String),

    /// Login failed. Deliberately carries no detail about which part of the
    /// credentials was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage-level failure. Any transaction that hits this has been
    /// aborted with no partial writes.
    #[error("Storage error: {0}")]
    Storage(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements, before any
/// business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
