//! Server lifecycle: bind, serve, drain.
//!
//! `Starting -> Listening -> ShuttingDown -> Stopped`. A shutdown trigger
//! (SIGINT/SIGTERM in production) starts a drain bounded by
//! [`SHUTDOWN_TIMEOUT`]; connections still open at the deadline are dropped
//! and the server stops regardless.
//!
//! Connections are driven directly with hyper so the [`ServerTimeouts`] can
//! be enforced per connection: `read` bounds the request head, `write`
//! bounds each request from dispatch to response, and `idle` closes
//! connections with no request in progress.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::response::IntoResponse;
use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower::ServiceExt;
use usersvc_core::error::{Result, UserError};

use crate::api::error::ApiError;
use crate::app_state::AppState;
use crate::config::{ServerTimeouts, ServiceConfig};
use crate::router;

pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    Starting = 0,
    Listening = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl ServerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ServerState::Starting,
            1 => ServerState::Listening,
            2 => ServerState::ShuttingDown,
            _ => ServerState::Stopped,
        }
    }
}

/// How the drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All connections finished before the deadline.
    Graceful,
    /// Deadline hit or the server errored while draining.
    Forced,
}

#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(ServerState::Starting as u8),
        }
    }
}

impl Lifecycle {
    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, to: ServerState) {
        let from = ServerState::from_u8(self.state.swap(to as u8, Ordering::AcqRel));
        tracing::info!(?from, ?to, "server state");
    }
}

pub struct UserServer {
    listener: TcpListener,
    app: Router,
    lifecycle: Arc<Lifecycle>,
    drain_timeout: Duration,
    timeouts: ServerTimeouts,
}

impl UserServer {
    pub async fn bind(addr: SocketAddr, app: Router) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| UserError::Internal(format!("bind {addr} failed: {e}")))?;
        Ok(Self {
            listener,
            app,
            lifecycle: Arc::new(Lifecycle::default()),
            drain_timeout: SHUTDOWN_TIMEOUT,
            timeouts: ServerTimeouts::default(),
        })
    }

    /// Override the drain deadline (tests).
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Override the per-connection timeouts (tests).
    pub fn with_timeouts(mut self, timeouts: ServerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> ServerTimeouts {
        self.timeouts
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| UserError::Internal(format!("local_addr: {e}")))
    }

    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    /// Serve until `shutdown` resolves, then drain.
    pub async fn run<F>(self, shutdown: F) -> Result<ShutdownOutcome>
    where
        F: Future<Output = ()> + Send,
    {
        let UserServer {
            listener,
            app,
            lifecycle,
            drain_timeout,
            timeouts,
        } = self;

        let (drain_tx, drain_rx) = watch::channel(false);
        let mut serving = tokio::spawn(accept_loop(listener, app, timeouts, drain_rx));
        lifecycle.transition(ServerState::Listening);

        tokio::select! {
            res = &mut serving => {
                lifecycle.transition(ServerState::Stopped);
                return match res {
                    Ok(()) => Ok(ShutdownOutcome::Graceful),
                    Err(e) => Err(UserError::Internal(format!("server task failed: {e}"))),
                };
            }
            _ = shutdown => {}
        }

        lifecycle.transition(ServerState::ShuttingDown);
        let _ = drain_tx.send(true);

        let outcome = match tokio::time::timeout(drain_timeout, &mut serving).await {
            Ok(Ok(())) => {
                tracing::info!("server shutdown complete");
                ShutdownOutcome::Graceful
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "server task failed while draining");
                ShutdownOutcome::Forced
            }
            Err(_) => {
                // Dropping the accept loop drops its JoinSet, aborting every connection.
                serving.abort();
                tracing::error!(timeout = ?drain_timeout, "server forced to shutdown");
                ShutdownOutcome::Forced
            }
        };

        lifecycle.transition(ServerState::Stopped);
        Ok(outcome)
    }
}

/// Accept until the drain signal, then wait for open connections to finish.
async fn accept_loop(
    listener: TcpListener,
    app: Router,
    timeouts: ServerTimeouts,
    mut drain_rx: watch::Receiver<bool>,
) {
    let mut conns = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    conns.spawn(serve_connection(stream, remote, app.clone(), timeouts, drain_rx.clone()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
            Some(_) = conns.join_next(), if !conns.is_empty() => {}
            _ = drain_rx.changed() => break,
        }
    }

    drop(listener);
    tracing::info!(open_connections = conns.len(), "draining connections");
    while conns.join_next().await.is_some() {}
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    app: Router,
    timeouts: ServerTimeouts,
    mut drain_rx: watch::Receiver<bool>,
) {
    let activity = Arc::new(ConnActivity::new());
    let tracker = Arc::clone(&activity);
    let write_timeout = timeouts.write;

    let service = service_fn(move |mut req: Request<Incoming>| {
        req.extensions_mut().insert(ConnectInfo(remote));
        let app = app.clone();
        let active = tracker.begin();
        async move {
            let _active = active;
            let resp = match tokio::time::timeout(write_timeout, app.oneshot(req)).await {
                Ok(Ok(resp)) => resp,
                Ok(Err(never)) => match never {},
                Err(_) => {
                    tracing::warn!(%remote, timeout = ?write_timeout, "request exceeded write timeout");
                    ApiError(UserError::Internal("write timeout".into())).into_response()
                }
            };
            Ok::<_, Infallible>(resp)
        }
    });

    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read);
    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let idle = idle_expired(&activity, timeouts.idle);
    tokio::pin!(idle);

    let mut closing = false;
    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(e) = res {
                    tracing::debug!(%remote, error = %e, "connection closed with error");
                }
                return;
            }
            _ = drain_rx.changed(), if !closing => {
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
            _ = &mut idle, if !closing => {
                closing = true;
                tracing::debug!(%remote, idle = ?timeouts.idle, "closing idle connection");
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

/// Per-connection request bookkeeping for the idle timer.
struct ConnActivity {
    opened: Instant,
    last_ms: AtomicU64,
    in_flight: AtomicUsize,
}

impl ConnActivity {
    fn new() -> Self {
        Self {
            opened: Instant::now(),
            last_ms: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    fn begin(self: &Arc<Self>) -> ActiveRequest {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.touch();
        ActiveRequest(Arc::clone(self))
    }

    fn touch(&self) {
        let ms = u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_ms.store(ms, Ordering::Release);
    }

    /// Time since the last request ended, or `None` while one is running.
    fn idle_for(&self) -> Option<Duration> {
        if self.in_flight.load(Ordering::Acquire) > 0 {
            return None;
        }
        let last = Duration::from_millis(self.last_ms.load(Ordering::Acquire));
        Some(self.opened.elapsed().saturating_sub(last))
    }
}

struct ActiveRequest(Arc<ConnActivity>);

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        self.0.touch();
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

async fn idle_expired(activity: &ConnActivity, idle: Duration) {
    loop {
        let wait = match activity.idle_for() {
            Some(elapsed) if elapsed >= idle => return,
            Some(elapsed) => idle - elapsed,
            None => idle,
        };
        tokio::time::sleep(wait).await;
    }
}

/// Resolve on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "received signal, shutting down gracefully"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "received signal, shutting down gracefully"),
    }
}

/// Build state from config, serve, and stop on SIGINT/SIGTERM.
pub async fn serve(cfg: ServiceConfig) -> Result<ShutdownOutcome> {
    let listen = cfg.server.listen_addr()?;
    let state = AppState::from_config(cfg).await?;
    let app = router::build_router(state);

    let server = UserServer::bind(listen, app).await?;
    let timeouts = server.timeouts();
    tracing::info!(
        address = %server.local_addr()?,
        read_timeout = ?timeouts.read,
        write_timeout = ?timeouts.write,
        idle_timeout = ?timeouts.idle,
        "usersvc starting"
    );

    server.run(shutdown_signal()).await
}
