use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use usersvc_core::{Result, User, UserError};

use super::UserStore;
use crate::obs::ServiceMetrics;

/// Map-backed store. Reads share the lock; inserts take it exclusively.
pub struct InMemoryUserStore {
    users: RwLock<HashMap<i64, User>>,
    metrics: Arc<ServiceMetrics>,
}

impl InMemoryUserStore {
    /// Store holding the three built-in demo users.
    pub fn seeded(metrics: Arc<ServiceMetrics>) -> Self {
        Self::with_users(seed_users(), metrics)
    }

    pub fn with_users(users: Vec<User>, metrics: Arc<ServiceMetrics>) -> Self {
        let users: HashMap<i64, User> = users.into_iter().map(|u| (u.id, u)).collect();
        metrics.set_users_total(users.len());
        Self {
            users: RwLock::new(users),
            metrics,
        }
    }
}

pub fn seed_users() -> Vec<User> {
    vec![
        User::new(1, "John Doe", "john@example.com"),
        User::new(2, "Jane Smith", "jane@example.com"),
        User::new(3, "Bob Johnson", "bob@example.com"),
    ]
}

fn poisoned() -> UserError {
    UserError::Store("user map lock poisoned".into())
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: i64) -> Result<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.len())
    }

    async fn insert(&self, mut user: User) -> Result<User> {
        user.validate()?;

        let count = {
            let mut users = self.users.write().map_err(|_| poisoned())?;
            if user.id <= 0 {
                user.id = users.keys().copied().max().unwrap_or(0).saturating_add(1);
            }
            users.insert(user.id, user.clone());
            users.len()
        };

        self.metrics.set_users_total(count);
        tracing::debug!(id = user.id, total = count, "user stored");
        Ok(user)
    }
}
