//! OS signal handling.
//!
//! SIGINT / SIGTERM (Ctrl-C on other platforms) engage the emergency
//! stop, so every pump line is forced off before the process exits, then
//! hand over to the caller's exit hook.  The listener runs on its own
//! thread with a current-thread tokio runtime; the control thread stays
//! fully synchronous.

use std::io;
use std::thread::{self, JoinHandle};

use log::{error, info};

use crate::safety::EmergencyStop;

/// Spawn the listener thread.  `on_signal` runs after the stop has been
/// engaged; the binary passes a hook that exits with status 130.
///
/// The handlers are installed before this returns, so a signal arriving
/// straight afterwards still engages the stop.
pub fn spawn_signal_handler(
    stop: EmergencyStop,
    on_signal: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut listener = {
        let _ctx = runtime.enter();
        Listener::install()?
    };

    thread::Builder::new().name("signals".into()).spawn(move || {
        if let Err(e) = runtime.block_on(listener.recv()) {
            error!("Signal handler error: {e}");
            return;
        }
        info!("Shutdown signal received; stopping all pumps");
        stop.engage();
        on_signal();
    })
}

#[cfg(unix)]
struct Listener {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Listener {
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> io::Result<()> {
        tokio::select! {
            _ = self.sigint.recv() => info!("Received SIGINT"),
            _ = self.sigterm.recv() => info!("Received SIGTERM"),
        }
        Ok(())
    }
}

#[cfg(windows)]
struct Listener {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl Listener {
    fn install() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> io::Result<()> {
        self.ctrl_c.recv().await;
        info!("Received Ctrl+C");
        Ok(())
    }
}
