//! Service config loader (strict parsing).
//!
//! Layering: built-in defaults, then an optional YAML file named by
//! `USERSVC_CONFIG`, then environment overrides. The result is validated once.

pub mod schema;

use std::fs;

use usersvc_core::error::{Result, UserError};

pub use schema::{RateLimitConfig, ServerSection, ServerTimeouts, ServiceConfig};

/// Environment variable naming an optional YAML config file.
pub const CONFIG_PATH_ENV: &str = "USERSVC_CONFIG";

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| UserError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| UserError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load config from the process environment.
pub fn load() -> Result<ServiceConfig> {
    let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.is_empty() => load_from_file(&path)?,
        _ => ServiceConfig::default(),
    };
    apply_env(&mut cfg, |k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

/// Apply `PORT`, `LOG_LEVEL`, `DATABASE_URL`, `RATE_LIMIT_RPS` and
/// `RATE_LIMIT_BURST` overrides. Empty values count as unset.
pub fn apply_env<F>(cfg: &mut ServiceConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |k: &str| lookup(k).filter(|v| !v.is_empty());

    if let Some(port) = get("PORT") {
        // ":8080" binds every interface.
        cfg.server.listen = match port.strip_prefix(':') {
            Some(p) => format!("0.0.0.0:{p}"),
            None => port,
        };
    }
    if let Some(level) = get("LOG_LEVEL") {
        cfg.log_level = level;
    }
    if let Some(url) = get("DATABASE_URL") {
        cfg.database_url = Some(url);
    }
    if let Some(rps) = get("RATE_LIMIT_RPS") {
        cfg.rate_limit.requests_per_second = rps
            .parse()
            .map_err(|e| UserError::Config(format!("RATE_LIMIT_RPS={rps}: {e}")))?;
    }
    if let Some(burst) = get("RATE_LIMIT_BURST") {
        cfg.rate_limit.burst_size = burst
            .parse()
            .map_err(|e| UserError::Config(format!("RATE_LIMIT_BURST={burst}: {e}")))?;
    }
    Ok(())
}
