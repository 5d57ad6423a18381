//! usersvc server library entry.
//!
//! This crate wires the user store, service, HTTP handlers, middleware chain
//! and lifecycle into a runnable service. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod context;
pub mod lifecycle;
pub mod middleware;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod router;
pub mod service;
pub mod store;
