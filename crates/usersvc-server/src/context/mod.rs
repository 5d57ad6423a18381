//! Request-scoped context shared across layers.
//!
//! The request-id middleware creates one [`RequestContext`] per request and
//! stores it in the request extensions; later stages and handlers read it
//! back instead of relying on ambient state.

pub mod request;

pub use request::RequestContext;
