//! usersvc core: transport-agnostic user model, validation, and error types.
//!
//! This crate defines the record shape and the error surface shared by the
//! store, service, and HTTP layers. It carries no runtime or transport
//! dependencies so the same rules apply to every store backend.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `UserError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;

/// Shared result type.
pub use error::{ClientCode, Result, UserError};
pub use model::{parse_user_id, User};
