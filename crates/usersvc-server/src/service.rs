//! User service: thin orchestration over a [`UserStore`].
//!
//! Turns store-level misses into `UserError::NotFound`, validates before any
//! write, and records lookup outcomes.

use std::sync::Arc;

use usersvc_core::{Result, User, UserError};

use crate::obs::ServiceMetrics;
use crate::store::UserStore;

pub struct UserService {
    store: Arc<dyn UserStore>,
    metrics: Arc<ServiceMetrics>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { store, metrics }
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        match self.store.get(id).await? {
            Some(user) => {
                self.metrics.record_user_lookup("found");
                Ok(user)
            }
            None => {
                self.metrics.record_user_lookup("not_found");
                Err(UserError::NotFound(id))
            }
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.store.list().await
    }

    pub async fn users_count(&self) -> Result<usize> {
        self.store.count().await
    }

    pub async fn add_user(&self, user: User) -> Result<User> {
        user.validate()?;
        self.store.insert(user).await
    }
}
