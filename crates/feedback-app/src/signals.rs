//! OS signal handling: a signal closes the session, it never aborts it
//!
//! The front-end turns the [`ShutdownSignal`] into a normal
//! [`SessionController::close`](crate::SessionController::close), so the
//! running command tree is killed and a result is still produced.

use std::fmt;

use tokio::sync::mpsc;

use feedback_core::prelude::*;

/// Which OS request ended the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT, or Ctrl+C on Windows
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGHUP: the controlling terminal went away
    Hangup,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownSignal::Interrupt => "interrupt",
            ShutdownSignal::Terminate => "terminate",
            ShutdownSignal::Hangup => "hangup",
        })
    }
}

/// Spawn a task that waits for the first shutdown signal and sends
/// `message(signal)` once
pub fn spawn_signal_handler<T, F>(tx: mpsc::UnboundedSender<T>, message: F)
where
    T: Send + 'static,
    F: FnOnce(ShutdownSignal) -> T + Send + 'static,
{
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                info!("Shutdown signal received ({})", signal);
                let _ = tx.send(message(signal));
            }
            Err(e) => error!("Signal handler error: {}", e),
        }
    });
}

/// Wait for a termination signal
async fn wait_for_signal() -> Result<ShutdownSignal> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sighup = signal(SignalKind::hangup())?;

        let received = tokio::select! {
            _ = sigint.recv() => ShutdownSignal::Interrupt,
            _ = sigterm.recv() => ShutdownSignal::Terminate,
            _ = sighup.recv() => ShutdownSignal::Hangup,
        };
        Ok(received)
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await?;
        Ok(ShutdownSignal::Interrupt)
    }
}
