//! Monitor scheduler
//!
//! One recurring timer with a fixed short period, independent of any
//! monitor's own schedule. Each tick invokes a caller-supplied "check all
//! due monitors" callback; the scheduler itself carries no persistent
//! state. Start is idempotent, stop is explicit.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct MonitorScheduler {
    tick: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorScheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            handle: Mutex::new(None),
        }
    }

    pub fn from_config(config: &crate::config::EngineConfig) -> Self {
        Self::new(Duration::from_secs(config.scheduler_tick_secs))
    }

    /// Start the timer. Calling start on a running scheduler is a no-op.
    pub fn start<F, Fut>(&self, mut check: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let tick = self.tick;
        debug!(tick_secs = tick.as_secs(), "monitor scheduler started");
        *guard = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                check().await;
            }
        }));
    }

    pub fn stop(&self) {
        let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = guard.take() {
            handle.abort();
            debug!("monitor scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for MonitorScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
