//! Readiness polling
//!
//! Connect-and-retry against the port the backend was told to bind, bounded
//! by [`ReadinessConfig`]. Replaces a fixed startup sleep.

use crate::config::ReadinessConfig;
use crate::endpoint::Endpoint;
use crate::error::BackendError;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

/// Try one connection to `endpoint`
pub async fn probe(endpoint: &Endpoint, connect_timeout: Duration) -> bool {
    let attempt = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
    matches!(timeout(connect_timeout, attempt).await, Ok(Ok(_)))
}

/// Poll `endpoint` until it accepts a connection
///
/// `exited` is consulted before every attempt and again after the first
/// successful connection; if it reports an exit status the wait ends with
/// [`BackendError::Exited`]. A child that died while something else answered
/// on its port is therefore never reported ready.
///
/// # Errors
/// - [`BackendError::Exited`] if the process died while waiting
/// - [`BackendError::NotReady`] once `config.timeout()` has elapsed
/// - [`BackendError::Io`] if `exited` fails
pub async fn wait_until_ready<F>(
    endpoint: &Endpoint,
    config: &ReadinessConfig,
    mut exited: F,
) -> Result<Duration, BackendError>
where
    F: FnMut() -> std::io::Result<Option<ExitStatus>>,
{
    let started = Instant::now();
    let deadline = started + config.timeout();
    let mut attempts = 0u32;

    loop {
        if let Some(status) = exited()? {
            return Err(BackendError::Exited {
                endpoint: endpoint.clone(),
                status,
            });
        }

        attempts += 1;
        if probe(endpoint, config.connect_timeout()).await {
            if let Some(status) = exited()? {
                return Err(BackendError::Exited {
                    endpoint: endpoint.clone(),
                    status,
                });
            }
            let waited = started.elapsed();
            tracing::debug!(%endpoint, attempts, ?waited, "backend accepting connections");
            return Ok(waited);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(BackendError::NotReady {
                endpoint: endpoint.clone(),
                waited: now - started,
            });
        }
        sleep(config.poll_interval().min(deadline - now)).await;
    }
}

/// Check that nothing is bound to `endpoint` yet
///
/// # Errors
/// Returns [`BackendError::PortInUse`] if the bind fails
pub async fn ensure_port_free(endpoint: &Endpoint) -> Result<(), BackendError> {
    let listener = tokio::net::TcpListener::bind((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|source| BackendError::PortInUse {
            endpoint: endpoint.clone(),
            source,
        })?;
    drop(listener);
    Ok(())
}

/// Reserve a currently free port on `host`
///
/// The listener is dropped before returning, so another process could take
/// the port in between; good enough for a single local run.
///
/// # Errors
/// Returns [`BackendError::PortAllocation`] if binding fails
pub async fn free_port(host: &str) -> Result<u16, BackendError> {
    let to_err = |source| BackendError::PortAllocation {
        host: host.to_string(),
        source,
    };
    let listener = tokio::net::TcpListener::bind((host, 0)).await.map_err(to_err)?;
    let port = listener.local_addr().map_err(to_err)?.port();
    Ok(port)
}
