use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::sync::watch;

/// Fires the shutdown signal. Dropping it without firing leaves every
/// [`Shutdown`] waiting forever.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Observer side of the shutdown signal, cheap to clone.
///
/// Every sleep in the dispatch path goes through [`Shutdown::sleep`] so an
/// interrupt is honored during poll waits, inter-lead pauses and retry backoff.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Creates a connected trigger/observer pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleeps for `duration` unless shutdown fires first.
    ///
    /// Returns `true` when the full duration elapsed, `false` when interrupted.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_triggered() {
            return false;
        }

        let mut rx = self.rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = async move {
                let closed = rx.wait_for(|fired| *fired).await.is_err();
                if closed {
                    // Trigger dropped without firing.
                    std::future::pending::<()>().await;
                }
            } => false,
        }
    }

    /// Resolves once shutdown fires.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|fired| *fired).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Waits for Ctrl-C (or SIGTERM on unix) and fires `trigger`.
///
/// If the handlers cannot be installed, the error is logged and the trigger
/// fires immediately.
pub async fn listen_for_signals(trigger: ShutdownTrigger) {
    fire_on(wait_for_signal(), trigger).await;
}

async fn fire_on<F>(signal: F, trigger: ShutdownTrigger)
where
    F: Future<Output = io::Result<&'static str>>,
{
    match signal.await {
        Ok(name) => tracing::info!("Received {}", name),
        Err(e) => tracing::error!("Could not listen for shutdown signals: {}; stopping", e),
    }
    trigger.trigger();
}

#[cfg(unix)]
async fn wait_for_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|_| "Ctrl-C"),
            _ = sigterm.recv() => Ok("SIGTERM"),
        },
        Err(e) => {
            tracing::warn!("Could not register SIGTERM handler: {}", e);
            tokio::signal::ctrl_c().await.map(|_| "Ctrl-C")
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "Ctrl-C")
}
