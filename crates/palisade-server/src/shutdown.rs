//! Shutdown signaling.
//!
//! [`ShutdownSignal`] is a cloneable flag backed by a watch channel. The
//! accept loop and every live connection hold a clone and race their work
//! against [`ShutdownSignal::triggered`]; once any clone calls
//! [`ShutdownSignal::trigger`] (or an OS signal arrives), all of them
//! observe it. Connection draining lives with the server, which owns the
//! configured drain timeout.
//!
//! # Example
//!
//! ```rust
//! use palisade_server::shutdown::ShutdownSignal;
//!
//! let shutdown = ShutdownSignal::new();
//! let shutdown_clone = shutdown.clone();
//!
//! shutdown.trigger();
//! assert!(shutdown_clone.is_shutdown());
//! ```

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable shutdown flag.
///
/// All clones share one underlying channel; triggering any clone is
/// observed by every other.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    state: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Creates a signal wired to SIGTERM and SIGINT.
    ///
    /// # Panics
    ///
    /// Panics if the OS signal handlers cannot be registered.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            wait_for_os_signal().await;
            trigger.trigger();
        });

        signal
    }

    /// Triggers shutdown. Idempotent.
    pub fn trigger(&self) {
        self.state.send_replace(true);
    }

    /// Returns `true` once shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.state.borrow()
    }

    /// Waits until shutdown is triggered.
    ///
    /// Resolves immediately when the signal was already triggered.
    pub async fn triggered(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives in self, so this can only resolve true.
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks until SIGTERM or SIGINT (Ctrl+C on non-Unix) arrives.
async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

        let received = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        tracing::info!("Received {received}, initiating graceful shutdown");
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to wait for Ctrl+C");
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }
}
