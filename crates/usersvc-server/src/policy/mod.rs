//! Request admission policy.
//!
//! Currently a single shared token bucket consulted by the rate-limit
//! middleware before any handler runs.

pub mod rate_limit;

pub use rate_limit::RateLimiter;
