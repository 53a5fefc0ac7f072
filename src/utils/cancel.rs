use crate::utils::constants::EXIT_CANCELLED;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, warn};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// What an interrupt should do to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Graceful,
    Force,
}

/// Shared stop signal for a run. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<Inner>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once the flag is raised, immediately if it already is.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking so a concurrent cancel is not missed.
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Record one interrupt: the first raises the flag, any later one asks
    /// for an immediate exit.
    pub fn interrupt(&self) -> Interrupt {
        if self.0.cancelled.swap(true, Ordering::SeqCst) {
            Interrupt::Force
        } else {
            self.0.notify.notify_waiters();
            Interrupt::Graceful
        }
    }

    /// First Ctrl-C raises the flag and lets in-flight work drain; a second
    /// one exits the process straight away.
    pub fn install_ctrl_c_handler(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                match flag.interrupt() {
                    Interrupt::Graceful => warn!(
                        "Interrupt received, finishing in-flight work and stopping (Ctrl-C again to force)"
                    ),
                    Interrupt::Force => {
                        error!("Second interrupt received, exiting now");
                        std::process::exit(i32::from(EXIT_CANCELLED));
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_second_interrupt_forces_exit() {
        let flag = CancelFlag::new();
        assert_eq!(flag.interrupt(), Interrupt::Graceful);
        assert!(flag.is_cancelled());
        assert_eq!(flag.clone().interrupt(), Interrupt::Force);
        assert_eq!(flag.interrupt(), Interrupt::Force);
    }

    #[tokio::test]
    async fn test_waiters_wake_on_cancel() {
        let flag = CancelFlag::new();
        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        flag.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter did not wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_returns_when_already_cancelled() {
        let flag = CancelFlag::new();
        flag.cancel();
        tokio::time::timeout(Duration::from_millis(100), flag.cancelled())
            .await
            .unwrap();
    }
}
