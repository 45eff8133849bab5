//! Repository implementations.
//!
//! One repository per aggregate. `sale` and `invite` also own the
//! multi-statement transactions of the system's core operations.

pub mod invite;
pub mod product;
pub mod sale;
pub mod user;
