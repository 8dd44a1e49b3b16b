use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Single cancellable deadline. Resetting aborts the pending task before the
/// new one is recorded, so at most one deadline is pending at any time.
///
/// Runs on the tokio timer, which lets tests drive it with a paused clock.
#[derive(Clone)]
pub struct InactivityTimer {
    timeout: Duration,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl InactivityTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Schedules `on_expire` one timeout from now, cancelling the previous
    /// deadline. Must be called from within a tokio runtime.
    pub fn reset<F>(&self, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let timeout = self.timeout;
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            on_expire();
        }));
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let make = move || {
            let f = f.clone();
            Box::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_timeout() {
        let (fired, make) = counter();
        let timer = InactivityTimer::new(Duration::from_secs(10));
        timer.reset(make());
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_pushes_deadline_back() {
        let (fired, make) = counter();
        let timer = InactivityTimer::new(Duration::from_secs(10));
        timer.reset(make());
        tokio::time::sleep(Duration::from_secs(6)).await;
        timer.reset(make());
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let (fired, make) = counter();
        let timer = InactivityTimer::new(Duration::from_secs(1));
        timer.reset(make());
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timer.is_pending());
    }
}
