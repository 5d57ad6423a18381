//! User storage backends.
//!
//! `UserStore` is the seam between the service and its data. The in-memory
//! store is the default; the PostgreSQL store is compiled with the `postgres`
//! feature and selected at startup when a database URL is configured.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use usersvc_core::{Result, User};

pub use memory::InMemoryUserStore;
#[cfg(feature = "postgres")]
pub use postgres::PgUserStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Ok(None)` when no record has this id.
    async fn get(&self, id: i64) -> Result<Option<User>>;

    /// Snapshot of all records, in no particular order.
    async fn list(&self) -> Result<Vec<User>>;

    async fn count(&self) -> Result<usize>;

    /// Validate then store. An id `<= 0` asks the store to assign one; a
    /// positive id replaces any record with that id.
    async fn insert(&self, user: User) -> Result<User>;
}
