//! Collection runner
//!
//! Drives the executor across an ordered list of requests for N
//! iterations or once per data-file row. Execution is strictly
//! sequential: a shared script scope persists across the whole run so
//! later requests observe variables set by earlier ones.

mod data;
mod report;

pub use data::{load_data_file, parse_csv, parse_json, DataRow};
pub use report::{run_to_json, run_to_text};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::executor::{ExecutionContext, Executor};
use crate::models::{
    AuthConfig, Collection, Environment, RequestTemplate, RunItemResult, RunResult, ScriptScope,
    TestOutcome, Variable,
};

/// Synthetic outcome name for items whose execution never completed
const REQUEST_FAILED_OUTCOME: &str = "Request failed";

/// How many times the request list is walked
#[derive(Debug, Clone)]
pub enum RunPlan {
    /// Fixed iteration count
    Iterations(usize),
    /// One iteration per data-file row
    Data(Vec<DataRow>),
}

impl RunPlan {
    pub fn iteration_count(&self) -> usize {
        match self {
            RunPlan::Iterations(n) => *n,
            RunPlan::Data(rows) => rows.len(),
        }
    }

    fn row(&self, iteration: usize) -> Option<&DataRow> {
        match self {
            RunPlan::Iterations(_) => None,
            RunPlan::Data(rows) => rows.get(iteration),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Restrict the run to a single folder
    pub folder_id: Option<String>,

    /// Fixed delay awaited after each request
    pub delay: Option<Duration>,
}

/// Runs a collection (or one folder) through the executor.
///
/// Cancellation is cooperative: the stop flag is checked before each
/// request starts, so an in-flight request always finishes and its
/// result is kept.
pub struct CollectionRunner<'a> {
    executor: &'a Executor,
    stop: Arc<AtomicBool>,
}

impl<'a> CollectionRunner<'a> {
    pub fn new(executor: &'a Executor) -> Self {
        Self {
            executor,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle the UI holds to stop the run after the in-flight request
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub async fn run(
        &self,
        collection: &Collection,
        environments: &[Environment],
        active_environment: Option<&str>,
        globals: &[Variable],
        plan: &RunPlan,
        options: &RunOptions,
    ) -> Result<RunResult> {
        let targets = collect_targets(collection, options.folder_id.as_deref());
        let started = Instant::now();

        let mut scope = ScriptScope::new();
        let mut items = Vec::new();
        let mut stopped = false;

        'iterations: for iteration in 0..plan.iteration_count() {
            for (request, folder_auth) in &targets {
                if self.stop.load(Ordering::SeqCst) {
                    stopped = true;
                    break 'iterations;
                }

                let ctx = ExecutionContext {
                    environments,
                    active_environment,
                    globals,
                    collection_auth: collection.auth.as_ref(),
                    folder_auth: *folder_auth,
                };

                let item = self
                    .run_item(request, &ctx, &mut scope, plan.row(iteration), iteration)
                    .await;
                items.push(item);

                if let Some(delay) = options.delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        let tests_passed = items
            .iter()
            .flat_map(|i| &i.outcomes)
            .filter(|o| o.passed)
            .count();
        let tests_failed = items
            .iter()
            .flat_map(|i| &i.outcomes)
            .filter(|o| !o.passed)
            .count();

        debug!(
            collection = %collection.name,
            items = items.len(),
            tests_passed,
            tests_failed,
            stopped,
            "collection run finished"
        );

        Ok(RunResult {
            collection_id: collection.id.clone(),
            collection_name: collection.name.clone(),
            items,
            tests_passed,
            tests_failed,
            duration_ms: started.elapsed().as_millis() as u64,
            stopped,
        })
    }

    /// Execute one item; an executor error becomes a synthetic failed
    /// item instead of aborting the run.
    async fn run_item(
        &self,
        request: &RequestTemplate,
        ctx: &ExecutionContext<'_>,
        scope: &mut ScriptScope,
        row: Option<&DataRow>,
        iteration: usize,
    ) -> RunItemResult {
        let item_started = Instant::now();

        match self.executor.execute(request, ctx, scope, row).await {
            Ok(result) => RunItemResult {
                request_id: request.id.clone(),
                request_name: request.name.clone(),
                method: request.method.clone(),
                url: request.url.clone(),
                iteration,
                status: Some(result.response.status),
                duration_ms: item_started.elapsed().as_millis() as u64,
                outcomes: result.test_outcomes,
                error: None,
            },
            Err(e) => {
                warn!(request = %request.name, error = %e, "request failed during run");
                RunItemResult {
                    request_id: request.id.clone(),
                    request_name: request.name.clone(),
                    method: request.method.clone(),
                    url: request.url.clone(),
                    iteration,
                    status: None,
                    duration_ms: item_started.elapsed().as_millis() as u64,
                    outcomes: vec![TestOutcome::failed(REQUEST_FAILED_OUTCOME, e.to_string())],
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Ordered request list for a run: collection root requests first, then
/// folders in order; or a single folder's requests. Each entry carries
/// the folder auth the request may inherit.
pub(crate) fn collect_targets<'c>(
    collection: &'c Collection,
    folder_id: Option<&str>,
) -> Vec<(&'c RequestTemplate, Option<&'c AuthConfig>)> {
    match folder_id {
        Some(id) => collection
            .folder(id)
            .map(|folder| {
                folder
                    .requests
                    .iter()
                    .map(|r| (r, folder.auth.as_ref()))
                    .collect()
            })
            .unwrap_or_default(),
        None => {
            let mut targets: Vec<(&RequestTemplate, Option<&AuthConfig>)> =
                collection.requests.iter().map(|r| (r, None)).collect();
            for folder in &collection.folders {
                targets.extend(folder.requests.iter().map(|r| (r, folder.auth.as_ref())));
            }
            targets
        }
    }
}
