//! Observer startup for embedding in the engine binary.
//!
//! [`spawn_observer`] binds the listener on the caller's task, so an
//! unusable address or a taken port is reported before the run starts,
//! then serves the router on a background Tokio task alongside the
//! step loop.
//!
//! # Usage
//!
//! ```rust,ignore
//! use counterline_observer::startup::{ServerConfig, spawn_observer};
//! use counterline_observer::state::AppState;
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new());
//! let observer = spawn_observer(&ServerConfig::default(), state).await?;
//! println!("dashboard at http://{}", observer.addr);
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::router::build_router;
use crate::state::AppState;

/// Where the Observer listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port. 0 picks a free port.
    pub port: u16,
}

impl ServerConfig {
    /// Parse `host:port` into a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Address`] if the pair is not a valid address.
    pub fn socket_addr(&self) -> Result<SocketAddr, StartupError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| StartupError::Address {
                host: self.host.clone(),
                port: self.port,
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// Errors raised while bringing the Observer up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// `host:port` does not form a socket address.
    #[error("invalid observer address {host}:{port}")]
    Address {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },

    /// The listener could not be bound.
    #[error("failed to bind observer on {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// A bound Observer serving on a background task.
#[derive(Debug)]
pub struct RunningObserver {
    /// Address actually bound, with the real port when 0 was requested.
    pub addr: SocketAddr,
    /// Serving task. Abort it to shut the Observer down.
    pub handle: JoinHandle<()>,
}

/// Bind the Observer and start serving in the background.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`StartupError::Address`] for an unparsable address and
/// [`StartupError::Bind`] when the listener cannot be bound. Errors while
/// serving happen on the background task and are logged.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<RunningObserver, StartupError> {
    let requested = config.socket_addr()?;
    let listener = TcpListener::bind(requested)
        .await
        .map_err(|source| StartupError::Bind {
            addr: requested,
            source,
        })?;
    let addr = listener.local_addr().unwrap_or(requested);

    let router = build_router(state);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "Observer server exited with error");
        }
    });

    info!(%addr, "Observer listening");
    Ok(RunningObserver { addr, handle })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn local(port: u16) -> ServerConfig {
        ServerConfig {
            host: String::from("127.0.0.1"),
            port,
        }
    }

    #[test]
    fn default_address_parses() {
        assert!(ServerConfig::default().socket_addr().is_ok());
    }

    #[test]
    fn bad_host_is_an_address_error() {
        let config = ServerConfig {
            host: String::from("not a host"),
            port: 8080,
        };
        assert!(matches!(
            config.socket_addr(),
            Err(StartupError::Address { port: 8080, .. })
        ));
    }

    #[tokio::test]
    async fn port_zero_reports_the_bound_port() {
        let observer = spawn_observer(&local(0), Arc::new(AppState::new()))
            .await
            .unwrap();
        assert_ne!(observer.addr.port(), 0);
        observer.handle.abort();
    }

    #[tokio::test]
    async fn taken_port_fails_before_serving() {
        let first = spawn_observer(&local(0), Arc::new(AppState::new()))
            .await
            .unwrap();
        let second = spawn_observer(&local(first.addr.port()), Arc::new(AppState::new())).await;
        assert!(matches!(second, Err(StartupError::Bind { .. })));
        first.handle.abort();
    }
}
