//! Fan-out of lookups and the join on all of them.
//!
//! The coordinator starts one [`LookupTask`] per key before it awaits any
//! of them, then suspends until every task has signalled completion. The
//! join is event driven: each handle's completion future goes into a
//! `FuturesUnordered`, so the caller wakes exactly when a task settles and
//! never polls on a timer.
//!
//! Reporting is all-or-nothing. A failed lookup does not cut the join
//! short; once every task is terminal the run either returns every result
//! in input order or an [`AggregateError`] naming each failed key.

use crate::error::{AggregateError, FanOutError};
use crate::sources::{build_source, LookupSource};
use crate::task::{LookupHandle, LookupTask};
use crate::types::{AggregateOutcome, LookupConfig, LookupKey, LookupResult, SourceKind};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Lifecycle of one fan-out run.
///
/// States only move forward, and `Aggregated` is only reached after every
/// dispatched task is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoordinatorState {
    NotStarted,
    Dispatching,
    AwaitingAll,
    Aggregated,
}

/// Dispatches lookups for a fixed list of keys and joins on all of them.
///
/// # Example
///
/// ```rust,no_run
/// use fanout_lookup_lib::{FanOutCoordinator, LookupConfig, LookupKey, SourceKind};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let coordinator =
///         FanOutCoordinator::for_source(SourceKind::GitHub, None, LookupConfig::default())?;
///     let keys = vec![LookupKey::new("rust-lang")?, LookupKey::new("tokio-rs")?];
///
///     let outcome = coordinator.run_all(&keys).await?;
///     println!("Elapsed time: {:?}", outcome.elapsed);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct FanOutCoordinator {
    source: Arc<dyn LookupSource>,
    config: LookupConfig,
}

impl FanOutCoordinator {
    pub fn new(source: Arc<dyn LookupSource>) -> Self {
        Self::with_config(source, LookupConfig::default())
    }

    pub fn with_config(source: Arc<dyn LookupSource>, config: LookupConfig) -> Self {
        Self { source, config }
    }

    /// Build a coordinator backed by one of the built-in HTTP sources.
    pub fn for_source(
        kind: SourceKind,
        base_url: Option<&str>,
        config: LookupConfig,
    ) -> Result<Self, FanOutError> {
        let source = build_source(kind, base_url, &config)?;
        Ok(Self::with_config(source, config))
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Look up every key concurrently and wait for all of them.
    ///
    /// Empty input yields an empty outcome straight away.
    pub async fn run_all(&self, keys: &[LookupKey]) -> Result<AggregateOutcome, AggregateError> {
        let mut run = self.dispatch(keys);
        run.join().await
    }

    /// Start one task per key and return without waiting.
    ///
    /// Keeping the returned [`FanOutRun`] lets callers inspect individual
    /// handles after [`FanOutRun::join`], including the successful ones of
    /// a run that failed as a whole.
    pub fn dispatch(&self, keys: &[LookupKey]) -> FanOutRun {
        let mut run = FanOutRun {
            handles: Vec::with_capacity(keys.len()),
            started: Instant::now(),
            elapsed: None,
            state: CoordinatorState::NotStarted,
        };

        run.advance(CoordinatorState::Dispatching);
        for key in keys {
            run.handles.push(LookupTask::start(
                Arc::clone(&self.source),
                key.clone(),
                &self.config,
            ));
        }
        tracing::debug!(
            count = keys.len(),
            source = self.source.name(),
            "dispatched lookups"
        );
        run.advance(CoordinatorState::AwaitingAll);

        run
    }
}

/// The tasks of one dispatched fan-out.
#[derive(Debug)]
pub struct FanOutRun {
    handles: Vec<LookupHandle>,
    started: Instant,
    elapsed: Option<Duration>,
    state: CoordinatorState,
}

impl FanOutRun {
    /// Handles in input order.
    pub fn handles(&self) -> &[LookupHandle] {
        &self.handles
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Whether every task has reached a terminal state. Never blocks.
    pub fn is_done(&self) -> bool {
        self.handles.iter().all(LookupHandle::is_done)
    }

    /// Wait until every task is terminal, then aggregate.
    ///
    /// Calling this again after it returned aggregates the same outcomes
    /// and reports the same elapsed time.
    pub async fn join(&mut self) -> Result<AggregateOutcome, AggregateError> {
        let total = self.handles.len();
        if total == 0 {
            tracing::debug!("no keys to look up");
            self.advance(CoordinatorState::Aggregated);
            return Ok(AggregateOutcome::empty());
        }

        let mut slots = vec![None; total];
        let mut last_completion = self.started;

        let mut completions: FuturesUnordered<_> = self
            .handles
            .iter()
            .enumerate()
            .map(|(index, handle)| async move { (index, handle.get().await) })
            .collect();

        while let Some((index, outcome)) = completions.next().await {
            let settled = self.handles[index].settled_at().unwrap_or_else(Instant::now);
            last_completion = last_completion.max(settled);
            tracing::debug!(
                key = %self.handles[index].key(),
                ok = outcome.is_ok(),
                remaining = completions.len(),
                "lookup completed"
            );
            slots[index] = Some(outcome);
        }
        drop(completions);

        debug_assert!(self.is_done());
        let measured = last_completion.duration_since(self.started);
        let elapsed = *self.elapsed.get_or_insert(measured);
        self.advance(CoordinatorState::Aggregated);

        let mut results: Vec<LookupResult> = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for outcome in slots.into_iter().flatten() {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) => failures.push(err),
            }
        }

        if !failures.is_empty() {
            tracing::warn!(
                failed = failures.len(),
                total,
                elapsed_ms = elapsed.as_millis() as u64,
                "fan-out finished with failures"
            );
            return Err(AggregateError::new(failures, total));
        }

        tracing::info!(
            count = total,
            elapsed_ms = elapsed.as_millis() as u64,
            "all lookups completed"
        );
        Ok(AggregateOutcome { results, elapsed })
    }

    fn advance(&mut self, next: CoordinatorState) {
        debug_assert!(next >= self.state, "{:?} -> {:?}", self.state, next);
        tracing::trace!(from = ?self.state, to = ?next, "fan-out state");
        self.state = next;
    }
}
