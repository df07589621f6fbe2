//! Monitors: scheduled unattended runs with thresholds and alerting

mod alert;
mod runner;
mod scheduler;

pub use alert::fire_webhook_alert;
pub use runner::MonitorRunner;
pub use scheduler::MonitorScheduler;

use crate::models::Monitor;

/// A monitor is due when it is enabled and its schedule interval has
/// elapsed since the last run. A never-run monitor counts from the epoch,
/// so in practice it is due immediately.
pub fn is_monitor_due(monitor: &Monitor, now_ms: i64) -> bool {
    monitor.enabled && now_ms - monitor.last_run_at.unwrap_or(0) >= monitor.schedule.interval_ms()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonitorSchedule;

    fn monitor(schedule: MonitorSchedule, last_run_at: Option<i64>, enabled: bool) -> Monitor {
        Monitor {
            id: "m1".into(),
            name: "health".into(),
            collection_id: "c1".into(),
            folder_id: None,
            environment_id: None,
            schedule,
            thresholds: Default::default(),
            webhook: Default::default(),
            email: Default::default(),
            enabled,
            created_at: 0,
            last_run_at,
        }
    }

    #[test]
    fn test_never_run_monitor_is_due() {
        let m = monitor(MonitorSchedule::FiveMinutes, None, true);
        assert!(is_monitor_due(&m, 1_700_000_000_000));
    }

    #[test]
    fn test_due_after_interval_elapses() {
        let last = 1_700_000_000_000;
        let m = monitor(MonitorSchedule::FiveMinutes, Some(last), true);

        // false immediately after a run
        assert!(!is_monitor_due(&m, last));
        assert!(!is_monitor_due(&m, last + 299_999));
        // true once the interval is reached: 5m => 300000 ms
        assert!(is_monitor_due(&m, last + 300_000));
    }

    #[test]
    fn test_disabled_monitor_never_due() {
        let m = monitor(MonitorSchedule::FiveMinutes, None, false);
        assert!(!is_monitor_due(&m, i64::MAX));
    }
}
