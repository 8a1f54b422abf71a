//! # Debounce Boundary
//!
//! Collapses a burst of invocations into one: each call cancels whatever is
//! still pending and re-arms the quiet period. The pending timer is a tokio
//! task owned by the [`Debouncer`]; it is aborted on supersession, on
//! [`Debouncer::cancel`], and when the debouncer is dropped.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Quiet period for list views.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);
/// Quiet period for dashboards.
pub const DASHBOARD_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Handed to each invocation. Async work checks it before publishing anything.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

pub struct Debouncer {
    quiet: Duration,
    current: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            current: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Schedule `f` after the quiet period, superseding any pending call.
    /// Must be called from within a tokio runtime.
    pub fn call<F, Fut>(&mut self, f: F)
    where
        F: FnOnce(Ticket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.ticket();
        let quiet = self.quiet;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if ticket.is_current() {
                f(ticket).await;
            }
        }));
    }

    /// Supersede everything handed out so far and return a ticket for an
    /// invocation the caller runs itself. A later [`Debouncer::call`] or
    /// [`Debouncer::cancel`] makes it stale.
    pub fn ticket(&mut self) -> Ticket {
        self.abort_pending();
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            generation,
            current: self.current.clone(),
        }
    }

    /// Drop any pending invocation; tickets already handed out go stale.
    pub fn cancel(&mut self) {
        self.current.fetch_add(1, Ordering::SeqCst);
        self.abort_pending();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map_or(false, |h| !h.is_finished())
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_once_with_last_value() {
        let mut debouncer = Debouncer::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        for term in ["a", "ab", "abc"] {
            let tx = tx.clone();
            debouncer.call(move |_| async move {
                let _ = tx.send(term);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(rx.try_recv().unwrap(), "abc");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_quiet_periods_each_run() {
        let mut debouncer = Debouncer::new(DASHBOARD_QUIET_PERIOD);
        let (tx, mut rx) = mpsc::unbounded_channel();

        for n in [1, 2] {
            let tx = tx.clone();
            debouncer.call(move |_| async move {
                let _ = tx.send(n);
            });
            tokio::time::sleep(Duration::from_millis(600)).await;
        }

        assert_eq!(rx.try_recv().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_runs_before_quiet_period() {
        let mut debouncer = Debouncer::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        debouncer.call(move |_| async move {
            let _ = tx.send(());
        });
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());
        assert!(debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_pending_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        {
            let mut debouncer = Debouncer::default();
            debouncer.call(move |_| async move {
                let _ = tx.send(());
            });
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        // Sender was dropped with the aborted task
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_makes_running_ticket_stale() {
        let mut debouncer = Debouncer::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        debouncer.call(move |ticket| async move {
            let _ = tx.send(ticket);
        });
        tokio::time::sleep(Duration::from_millis(350)).await;

        let ticket = rx.try_recv().unwrap();
        assert!(ticket.is_current());
        debouncer.cancel();
        assert!(!ticket.is_current());
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_ticket_goes_stale_on_next_call() {
        let mut debouncer = Debouncer::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tx2 = tx.clone();
        debouncer.call(move |_| async move {
            let _ = tx2.send("debounced");
        });

        let ticket = debouncer.ticket();
        assert!(ticket.is_current());
        assert!(!debouncer.is_pending());

        debouncer.call(move |_| async move {
            let _ = tx.send("latest");
        });
        assert!(!ticket.is_current());
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(rx.try_recv().unwrap(), "latest");
        assert!(rx.try_recv().is_err());
    }
}
