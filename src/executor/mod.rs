//! Bounded parallel executor.
//!
//! Runs every submitted work item exactly once on its own tokio task, lets at
//! most `max_parallel` of them run their worker at the same time, waits for
//! all of them, and reports every failure.
//!
//! Per item: `Pending -> WaitingForPermit -> Running -> Succeeded | Failed`.
//!
//! There is no cancellation or deadline here. Workers own their timeouts.
//! Dropping the future returned by [`Executor::execute_keyed`] or
//! [`Executor::execute_all`] aborts every in-flight item, because the
//! underlying `JoinSet` aborts its tasks on drop.

pub mod gate;
pub mod report;

pub use gate::{ConcurrencyGate, Permit};
pub use report::{AggregatedError, ExecutionReport, ExecutionStats, FailureSink, ItemFailure};

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt as _;
use opentelemetry::KeyValue;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::event::{Event, EventEmitter};
use crate::model::{ItemId, ItemState, Task};
use crate::telemetry::metrics;
use crate::telemetry::work::{record_state_transition, start_execution_span, start_item_span};

/// Run a keyed collection of items through `worker`, at most `max_parallel`
/// at a time.
///
/// Fails with [`Error::Config`](crate::error::Error::Config) before touching
/// any item if `max_parallel` is zero, and with
/// [`Error::Aggregated`](crate::error::Error::Aggregated) if any item failed.
pub async fn run_keyed<I, K, T, F, Fut, E>(items: I, worker: F, max_parallel: usize) -> Result<()>
where
    I: IntoIterator<Item = (K, T)>,
    K: Display,
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    Executor::new(max_parallel)?
        .execute_keyed(items, worker)
        .await?
        .into_result()
}

/// Run a sequence of jobs, at most `max_parallel` at a time. Jobs are
/// identified by their 0-based position.
pub async fn run_all<I, J, Fut, E>(jobs: I, max_parallel: usize) -> Result<()>
where
    I: IntoIterator<Item = J>,
    J: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    Executor::new(max_parallel)?
        .execute_all(jobs)
        .await?
        .into_result()
}

/// Run task records keyed by task id, logging each task as it starts.
pub async fn run_tasks<F, Fut, E>(
    tasks: HashMap<String, Task>,
    worker: F,
    max_parallel: usize,
) -> Result<()>
where
    F: Fn(Task) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let worker = Arc::new(worker);
    run_keyed(
        tasks,
        move |task: Task| {
            info!(task_id = %task.id, task_type = %task.kind, "running task");
            (*worker)(task)
        },
        max_parallel,
    )
    .await
}

/// Reusable executor configuration.
///
/// Each call to `execute_*` gets its own concurrency gate and failure sink;
/// nothing is shared between invocations.
#[derive(Debug, Clone)]
pub struct Executor {
    max_parallel: usize,
    events: Option<UnboundedSender<Event>>,
}

impl Executor {
    /// Create an executor. Zero is rejected here, before any work exists.
    pub fn new(max_parallel: usize) -> Result<Self> {
        Ok(Self {
            max_parallel: gate::check_capacity(max_parallel)?,
            events: None,
        })
    }

    /// Emit every item state transition on `sender`.
    pub fn with_events(mut self, sender: UnboundedSender<Event>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Run keyed items through `worker` and report on all of them.
    ///
    /// Item failures never make this return `Err`; they are in the report.
    pub async fn execute_keyed<I, K, T, F, Fut, E>(
        &self,
        items: I,
        worker: F,
    ) -> Result<ExecutionReport>
    where
        I: IntoIterator<Item = (K, T)>,
        K: Display,
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let worker = Arc::new(worker);
        let jobs = items.into_iter().map(|(key, item)| {
            let worker = Arc::clone(&worker);
            (ItemId::key(key), move || (*worker)(item))
        });
        self.execute(jobs).await
    }

    /// Run positional jobs and report on all of them.
    pub async fn execute_all<I, J, Fut, E>(&self, jobs: I) -> Result<ExecutionReport>
    where
        I: IntoIterator<Item = J>,
        J: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let jobs = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| (ItemId::Index(index), job));
        self.execute(jobs).await
    }

    async fn execute<I, J, Fut, E>(&self, jobs: I) -> Result<ExecutionReport>
    where
        I: Iterator<Item = (ItemId, J)>,
        J: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let started = Instant::now();
        let gate = ConcurrencyGate::new(self.max_parallel)?;
        let execution_id = Uuid::new_v4();
        let span = start_execution_span(&execution_id, self.max_parallel);

        let report = async {
            let sink = FailureSink::new();
            let emitter = EventEmitter::new(self.events.clone());

            // Slot per dispatched item; cleared when its task reports back.
            let mut outstanding: Vec<Option<ItemId>> = Vec::new();
            let mut set = JoinSet::new();

            for (slot, (item, job)) in jobs.enumerate() {
                let ctx = ItemContext {
                    slot,
                    item: item.clone(),
                    gate: gate.clone(),
                    sink: sink.clone(),
                    emitter: emitter.clone(),
                };
                let item_span = start_item_span(&item);
                set.spawn(run_item(ctx, job).instrument(item_span));
                outstanding.push(Some(item));
            }

            let dispatched = outstanding.len();
            tracing::Span::current().record("fanout.items", dispatched);
            metrics::items_dispatched().add(dispatched as u64, &[]);
            debug!(dispatched, "all items dispatched");

            // Barrier: wait for every item to reach a terminal state.
            let mut succeeded = 0;
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(ItemOutcome { slot, ok }) => {
                        outstanding[slot] = None;
                        if ok {
                            succeeded += 1;
                        }
                    }
                    Err(e) => error!("work item task did not complete: {e}"),
                }
            }

            // Tasks that never reported back (aborted by the runtime) still
            // count as failures so every item appears exactly once.
            for item in outstanding.into_iter().flatten() {
                sink.record(item, "work item task aborted before completion");
            }

            let failures = sink.into_failures();
            let stats = ExecutionStats {
                dispatched,
                succeeded,
                failed: failures.len(),
                peak_running: gate.peak(),
                leaked_permits: gate.capacity() - gate.available(),
                elapsed: started.elapsed(),
            };

            if failures.is_empty() {
                info!(
                    dispatched,
                    peak_running = stats.peak_running,
                    "all work items succeeded"
                );
            } else {
                warn!(
                    dispatched,
                    failed = failures.len(),
                    "work items failed"
                );
            }

            ExecutionReport { failures, stats }
        }
        .instrument(span)
        .await;

        Ok(report)
    }
}

/// Everything one execution context needs, moved onto its task.
struct ItemContext {
    slot: usize,
    item: ItemId,
    gate: ConcurrencyGate,
    sink: FailureSink,
    emitter: EventEmitter,
}

impl ItemContext {
    fn transition(&self, from: ItemState, to: ItemState) {
        record_state_transition(&tracing::Span::current(), from, to);
        self.emitter.transition(&self.item, from, to);
    }
}

struct ItemOutcome {
    slot: usize,
    ok: bool,
}

async fn run_item<J, Fut, E>(ctx: ItemContext, job: J) -> ItemOutcome
where
    J: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<(), E>>,
    E: Display,
{
    ctx.transition(ItemState::Pending, ItemState::WaitingForPermit);

    let wait_start = Instant::now();
    let permit = match ctx.gate.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            // Unreachable in practice: the gate is never closed.
            ctx.sink.record(ctx.item.clone(), e.to_string());
            return ItemOutcome {
                slot: ctx.slot,
                ok: false,
            };
        }
    };
    metrics::permit_wait_ms().record(wait_start.elapsed().as_secs_f64() * 1000.0, &[]);

    ctx.transition(ItemState::WaitingForPermit, ItemState::Running);
    let run_start = Instant::now();

    // job() is called inside the guard so a panic while building the
    // future is caught too.
    let outcome = AssertUnwindSafe(async move { job().await })
        .catch_unwind()
        .await;

    drop(permit);
    metrics::item_duration_ms().record(run_start.elapsed().as_secs_f64() * 1000.0, &[]);

    let (ok, result_label) = match outcome {
        Ok(Ok(())) => (true, "ok"),
        Ok(Err(e)) => {
            warn!(item = %ctx.item, error = %e, "work item failed");
            ctx.sink.record(ctx.item.clone(), e.to_string());
            (false, "error")
        }
        Err(panic) => {
            let reason = format!("worker panicked: {}", panic_message(panic.as_ref()));
            error!(item = %ctx.item, %reason, "work item panicked");
            ctx.sink.record(ctx.item.clone(), reason);
            (false, "panic")
        }
    };

    metrics::items_completed().add(1, &[KeyValue::new("result", result_label)]);

    let terminal = if ok {
        ItemState::Succeeded
    } else {
        ItemState::Failed
    };
    ctx.transition(ItemState::Running, terminal);

    ItemOutcome { slot: ctx.slot, ok }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
