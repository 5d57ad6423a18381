use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use usersvc_core::{Result, User, UserError};

use super::UserStore;
use crate::obs::ServiceMetrics;

// Explicit ids bypass the serial sequence; move it past them.
const SYNC_ID_SEQUENCE: &str =
    "SELECT setval(pg_get_serial_sequence('users', 'id'), GREATEST(MAX(id), 1)) FROM users";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL
)";

/// Table-backed store. Concurrency is left to the pool; each call checks out
/// its own connection and shares no transaction state.
pub struct PgUserStore {
    pool: PgPool,
    metrics: Arc<ServiceMetrics>,
}

fn db_err(e: sqlx::Error) -> UserError {
    UserError::Store(e.to_string())
}

type UserRow = (i64, String, String);

fn from_row((id, name, email): UserRow) -> User {
    User { id, name, email }
}

impl PgUserStore {
    /// Connect and make sure the `users` table exists.
    pub async fn connect(url: &str, metrics: Arc<ServiceMetrics>) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(db_err)?;
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(db_err)?;
        tracing::info!("database connection established");

        let store = Self { pool, metrics };
        let count = store.count().await?;
        store.metrics.set_users_total(count);
        Ok(store)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, email FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(from_row))
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT id, name, email FROM users")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn count(&self) -> Result<usize> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    async fn insert(&self, user: User) -> Result<User> {
        user.validate()?;

        let (id,): (i64,) = if user.id <= 0 {
            sqlx::query_as("INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id")
                .bind(&user.name)
                .bind(&user.email)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?
        } else {
            let row = sqlx::query_as(
                "INSERT INTO users (id, name, email) VALUES ($1, $2, $3)
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email
                 RETURNING id",
            )
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
            sqlx::query(SYNC_ID_SEQUENCE)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
            row
        };

        let count = self.count().await?;
        self.metrics.set_users_total(count);
        Ok(User { id, ..user })
    }
}
