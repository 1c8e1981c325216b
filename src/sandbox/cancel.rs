//! Cancellation plumbing for the job runner.
//!
//! Nothing cancels a job today: a job that never exits blocks its request
//! indefinitely, matching the service's documented behavior. The token is
//! threaded through every suspending stage anyway so a caller-supplied
//! timeout can be layered on later without touching the runner.

use tokio::sync::watch;

/// Fires cancellation for the paired [`CancelToken`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the job. Idempotent; safe to call after the job finished.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving side, passed into [`JobRunner::execute_with_cancel`].
///
/// [`JobRunner::execute_with_cancel`]: crate::sandbox::JobRunner::execute_with_cancel
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A connected handle/token pair.
    pub fn pair() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that can never fire, for callers without a cancel path.
    pub fn disarmed() -> CancelToken {
        let (_tx, rx) = watch::channel(false);
        CancelToken { rx }
    }

    /// Resolves once the paired handle fires. A disarmed token (or one whose
    /// handle was dropped without firing) never resolves.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
