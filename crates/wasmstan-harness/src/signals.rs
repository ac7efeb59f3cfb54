//! Shutdown signals
//!
//! Handlers are installed by [`ShutdownSignals::register`], not on first
//! poll, so a signal that arrives during preconditions or backend startup is
//! still delivered to the run and its teardown instead of killing the process.

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// SIGINT and SIGTERM for one run
#[derive(Debug)]
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl ShutdownSignals {
    /// Install the handlers
    ///
    /// Must be called from inside a tokio runtime.
    ///
    /// # Errors
    /// If the OS refuses a handler
    #[cfg(unix)]
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Install the handlers
    ///
    /// # Errors
    /// Never on this platform; Ctrl-C is hooked when [`ShutdownSignals::recv`] runs
    #[cfg(not(unix))]
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Resolve once either signal arrives
    #[cfg(unix)]
    pub async fn recv(mut self) {
        let name = tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        };
        tracing::warn!(signal = name, "shutdown requested");
    }

    /// Resolve once Ctrl-C is pressed
    #[cfg(not(unix))]
    pub async fn recv(self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::warn!(signal = "ctrl-c", "shutdown requested");
    }
}
