//! # amantena-service: Orchestration Layer for the Amantena Backend
//!
//! Wires storage, notifications, and invite mail together behind a small
//! set of services. The API surface (HTTP, sockets) consumes this crate
//! and lives outside this repository.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     amantena-service (THIS CRATE)                       │
//! │                                                                         │
//! │  ┌──────────────┐  ┌───────────────┐  ┌──────────────┐                │
//! │  │ SaleService  │  │ InviteService │  │ AuthService  │                │
//! │  │              │  │               │  │              │                │
//! │  │ record sale  │  │ create/verify │  │ credential   │                │
//! │  │ reverse sale │  │ register      │  │ verification │                │
//! │  │ fan out      │  │ resend/cancel │  │ (argon2)     │                │
//! │  │ events ──┐   │  │ send mail ─┐  │  └──────────────┘                │
//! │  └──────────┼───┘  └────────────┼──┘                                  │
//! │             ▼                   ▼                                      │
//! │      ┌────────────┐     ┌──────────────┐                              │
//! │      │  EventBus  │     │ InviteMailer │  (trait; prod impl sends     │
//! │      │ (broadcast)│     │              │   real mail, tests fake it)  │
//! │      └────────────┘     └──────────────┘                              │
//! │             │                                                           │
//! │             ▼                                                           │
//! │      amantena-db (repositories, transactions)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment-based application configuration
//! - [`auth`] - Credential verification
//! - [`password`] - Argon2 hashing helpers
//! - [`mailer`] - Invite mail delivery trait + logging implementation
//! - [`notify`] - Broadcast event bus
//! - [`sales`] - Sale recording and reversal
//! - [`invites`] - Invite lifecycle orchestration

pub mod auth;
pub mod config;
pub mod invites;
pub mod mailer;
pub mod notify;
pub mod password;
pub mod sales;

pub use auth::AuthService;
pub use config::{AppConfig, ConfigError};
pub use invites::{InviteService, RegisterRequest};
pub use mailer::{InviteMail, InviteMailer, LogMailer};
pub use notify::{Event, EventBus, TOPIC_LOW_STOCK_ALERT, TOPIC_PRODUCT_UPDATED, TOPIC_SALE_CREATED};
pub use sales::{RecordSaleRequest, SaleReceipt, SaleService};
