//! Shared application state for the user service.
//!
//! Built once at startup; every component receives its collaborators
//! (store, metrics, limiter) from here instead of from globals.

use std::sync::Arc;

use usersvc_core::error::Result;

use crate::config::ServiceConfig;
use crate::obs::ServiceMetrics;
use crate::policy::RateLimiter;
use crate::service::UserService;
use crate::store::{InMemoryUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    users: Arc<UserService>,
    metrics: Arc<ServiceMetrics>,
}

struct AppStateInner {
    limiter: RateLimiter,
}

impl AppState {
    pub fn new(cfg: ServiceConfig, store: Arc<dyn UserStore>, metrics: Arc<ServiceMetrics>) -> Self {
        let limiter = RateLimiter::from_config(&cfg.rate_limit);
        let users = Arc::new(UserService::new(store, Arc::clone(&metrics)));
        Self {
            inner: Arc::new(AppStateInner { limiter }),
            users,
            metrics,
        }
    }

    /// Build state with the store the config asks for.
    pub async fn from_config(cfg: ServiceConfig) -> Result<Self> {
        let metrics = Arc::new(ServiceMetrics::new());
        let store = open_store(&cfg, Arc::clone(&metrics)).await?;
        Ok(Self::new(cfg, store, metrics))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn metrics(&self) -> Arc<ServiceMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[cfg(feature = "postgres")]
async fn open_store(cfg: &ServiceConfig, metrics: Arc<ServiceMetrics>) -> Result<Arc<dyn UserStore>> {
    match &cfg.database_url {
        Some(url) => {
            let store = crate::store::PgUserStore::connect(url, metrics).await?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryUserStore::seeded(metrics))),
    }
}

#[cfg(not(feature = "postgres"))]
async fn open_store(cfg: &ServiceConfig, metrics: Arc<ServiceMetrics>) -> Result<Arc<dyn UserStore>> {
    if cfg.database_url.is_some() {
        tracing::warn!("database_url is set but postgres support is not compiled in; using in-memory store");
    }
    Ok(Arc::new(InMemoryUserStore::seeded(metrics)))
}
