//! usersvc binary.
//!
//! Endpoints: `/user?id=`, `/users`, `/health`, `/metrics`.
//! Config from `USERSVC_CONFIG` (optional YAML) and environment overrides.

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use usersvc_server::{config, lifecycle};

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("usersvc: {e}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    fmt().with_env_filter(filter).init();

    match lifecycle::serve(cfg).await {
        Ok(outcome) => {
            tracing::info!(?outcome, "usersvc stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "usersvc failed");
            ExitCode::FAILURE
        }
    }
}
