//! Top-level facade crate for usersvc.
//!
//! Re-exports the domain types and the server library so users can depend on a single crate.

pub mod core {
    pub use usersvc_core::*;
}

pub mod server {
    pub use usersvc_server::*;
}
