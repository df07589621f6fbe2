//! Monitor runner
//!
//! Executes every request in a monitor's target sequentially, judges the
//! run against the monitor's thresholds, records bounded history, and
//! fires the alerter on failure. Monitors for different targets may run
//! concurrently; the only shared state is the store, whose appends are
//! atomic.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::{alert, is_monitor_due};
use crate::config::EngineConfig;
use crate::errors::{ReqforgeError, Result};
use crate::executor::{ExecutionContext, Executor};
use crate::models::{Monitor, MonitorItemSummary, MonitorRunRecord, ScriptScope};
use crate::runner::collect_targets;
use crate::storage::WorkspaceStore;

pub struct MonitorRunner<S: WorkspaceStore> {
    executor: Arc<Executor>,
    store: Arc<S>,
    history_limit: usize,
}

impl<S: WorkspaceStore> MonitorRunner<S> {
    pub fn new(executor: Arc<Executor>, store: Arc<S>, config: &EngineConfig) -> Self {
        Self {
            executor,
            store,
            history_limit: config.monitor_history_limit,
        }
    }

    /// Scheduler callback: run every due monitor in the workspace.
    /// Individual run errors are logged, never propagated; one broken
    /// monitor must not starve the others.
    pub async fn check_due_monitors(&self, workspace: &str) {
        let now_ms = chrono::Utc::now().timestamp_millis();
        for monitor in self.store.monitors(workspace) {
            if !is_monitor_due(&monitor, now_ms) {
                continue;
            }
            if let Err(e) = self.run_monitor(workspace, &monitor).await {
                warn!(monitor = %monitor.name, error = %e, "monitor run failed to execute");
            }
        }
    }

    /// Run one monitor now, regardless of schedule.
    ///
    /// The record is appended to the bounded history and `last_run_at`
    /// is updated unconditionally, pass or fail.
    pub async fn run_monitor(&self, workspace: &str, monitor: &Monitor) -> Result<MonitorRunRecord> {
        let started_at = chrono::Utc::now().timestamp_millis();

        let collections = self.store.collections(workspace);
        let Some(collection) = collections.iter().find(|c| c.id == monitor.collection_id) else {
            // still stamp the monitor so a dangling target does not
            // re-trigger on every scheduler tick
            self.store
                .update_monitor_last_run(workspace, &monitor.id, started_at);
            return Err(ReqforgeError::Storage(format!(
                "monitor '{}' targets missing collection '{}'",
                monitor.name, monitor.collection_id
            )));
        };

        let environments = self.store.environments(workspace);
        let globals = self.store.globals(workspace);
        let targets = collect_targets(collection, monitor.folder_id.as_deref());

        let mut scope = ScriptScope::new();
        let mut items = Vec::with_capacity(targets.len());
        let mut tests_passed = 0usize;
        let mut tests_failed = 0usize;

        for (request, folder_auth) in targets {
            let ctx = ExecutionContext {
                environments: &environments,
                active_environment: monitor.environment_id.as_deref(),
                globals: &globals,
                collection_auth: collection.auth.as_ref(),
                folder_auth,
            };

            let item_started = Instant::now();
            match self.executor.execute(request, &ctx, &mut scope, None).await {
                Ok(result) => {
                    let failed_tests = result.test_outcomes.iter().filter(|o| !o.passed).count();
                    tests_failed += failed_tests;
                    tests_passed += result.test_outcomes.len() - failed_tests;

                    let status = result.response.status;
                    let item_passed = (200..400).contains(&status) && failed_tests == 0;
                    items.push(MonitorItemSummary {
                        request_name: request.name.clone(),
                        status: Some(status),
                        duration_ms: result.response.time_ms,
                        passed: item_passed,
                        error: None,
                    });
                }
                Err(e) => {
                    items.push(MonitorItemSummary {
                        request_name: request.name.clone(),
                        status: None,
                        duration_ms: item_started.elapsed().as_millis() as u64,
                        passed: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let max_response_time_ms = items.iter().map(|i| i.duration_ms).max().unwrap_or(0);
        let min_status_code = items.iter().filter_map(|i| i.status).min().unwrap_or(0);
        let failed_requests = items.iter().filter(|i| !i.passed).count();

        let threshold_breached = monitor
            .thresholds
            .max_response_time_ms
            .is_some_and(|limit| max_response_time_ms > limit)
            || monitor
                .thresholds
                .min_status_code
                .is_some_and(|limit| min_status_code < limit)
            || (monitor.thresholds.alert_on_test_failure && tests_failed > 0);

        let passed = failed_requests == 0 && !threshold_breached;
        let finished_at = chrono::Utc::now().timestamp_millis();

        let record = MonitorRunRecord {
            monitor_id: monitor.id.clone(),
            monitor_name: monitor.name.clone(),
            started_at,
            finished_at,
            passed,
            total_requests: items.len(),
            failed_requests,
            tests_passed,
            tests_failed,
            max_response_time_ms,
            min_status_code,
            items,
        };

        self.store
            .append_monitor_record(workspace, record.clone(), self.history_limit);
        self.store
            .update_monitor_last_run(workspace, &monitor.id, finished_at);

        info!(
            monitor = %monitor.name,
            passed,
            requests = record.total_requests,
            max_ms = max_response_time_ms,
            "monitor run recorded"
        );

        if !passed {
            alert::fire_webhook_alert(monitor, &record);
        }

        Ok(record)
    }
}
