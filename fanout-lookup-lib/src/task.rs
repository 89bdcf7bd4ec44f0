//! A single in-flight lookup.
//!
//! [`LookupTask::start`] spawns the remote call onto the tokio runtime and
//! hands back a [`LookupHandle`]. The handle observes the task's
//! [`TaskState`] through a `watch` channel: the spawned unit is the only
//! writer and moves the state out of `Pending` exactly once.

use crate::error::TransportError;
use crate::sources::LookupSource;
use crate::types::{LookupConfig, LookupKey, LookupResult, TaskState};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::Instrument;

/// Launches lookups.
pub struct LookupTask;

impl LookupTask {
    /// Begin looking up `key` on `source` without waiting for it.
    ///
    /// Must be called from within a tokio runtime. The returned handle can
    /// be cloned freely; every clone observes the same task.
    pub fn start(
        source: Arc<dyn LookupSource>,
        key: LookupKey,
        config: &LookupConfig,
    ) -> LookupHandle {
        let (tx, rx) = watch::channel(TaskState::Pending);
        let settled_at = Arc::new(OnceLock::new());
        let span = tracing::debug_span!("lookup", key = %key, source = source.name());

        let task_key = key.clone();
        let timeout = config.task_timeout;
        let latency = config.simulated_latency;
        let task_settled_at = Arc::clone(&settled_at);

        tokio::spawn(
            async move {
                let started = Instant::now();
                tracing::debug!("looking up {}", task_key);

                let fetched = match timeout {
                    Some(limit) => {
                        match tokio::time::timeout(limit, source.fetch(&task_key)).await {
                            Ok(fetched) => fetched,
                            Err(_) => Err(TransportError::timeout(task_key.as_str(), limit)),
                        }
                    }
                    None => source.fetch(&task_key).await,
                };

                let state = match fetched {
                    Ok(payload) => {
                        // Simulated latency only follows a call that returned.
                        if let Some(delay) = latency {
                            tokio::time::sleep(delay).await;
                        }
                        TaskState::Done(LookupResult {
                            key: task_key,
                            payload,
                            source: source.name().to_string(),
                            fetch_duration: started.elapsed(),
                        })
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "lookup failed");
                        TaskState::Failed(err)
                    }
                };

                // Stamped before publishing so observers of a terminal state see it.
                let _ = task_settled_at.set(Instant::now());
                settle(&tx, state);
            }
            .instrument(span),
        );

        LookupHandle {
            key,
            state: rx,
            settled_at,
        }
    }
}

/// Move a task out of `Pending`. Returns false, leaving the state intact,
/// when the task had already settled.
fn settle(tx: &watch::Sender<TaskState>, next: TaskState) -> bool {
    let settled = tx.send_if_modified(|state| {
        if state.is_terminal() {
            return false;
        }
        *state = next;
        true
    });
    if !settled {
        tracing::warn!("ignoring second completion of an already settled lookup");
    }
    settled
}

/// Completion handle of a [`LookupTask`].
#[derive(Debug, Clone)]
pub struct LookupHandle {
    key: LookupKey,
    state: watch::Receiver<TaskState>,
    settled_at: Arc<OnceLock<Instant>>,
}

impl LookupHandle {
    pub fn key(&self) -> &LookupKey {
        &self.key
    }

    /// Whether the task reached a terminal state. Never blocks.
    pub fn is_done(&self) -> bool {
        self.state.borrow().is_terminal()
    }

    /// When the task settled, or `None` while it is pending (or if it died
    /// without settling).
    pub fn settled_at(&self) -> Option<Instant> {
        self.settled_at.get().copied()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> TaskState {
        self.state.borrow().clone()
    }

    /// Wait for the task to settle and return its outcome.
    ///
    /// Returns immediately once the task is terminal, and never starts the
    /// remote call again. A failed task yields its [`TransportError`].
    pub async fn get(&self) -> Result<LookupResult, TransportError> {
        let mut rx = self.state.clone();
        let settled = rx
            .wait_for(TaskState::is_terminal)
            .await
            .map(|state| state.clone());
        let state = match settled {
            Ok(state) => state,
            // The writer went away; it may still have settled first.
            Err(_) => rx.borrow().clone(),
        };

        match state {
            TaskState::Done(result) => Ok(result),
            TaskState::Failed(err) => Err(err),
            TaskState::Pending => Err(TransportError::internal(
                self.key.as_str(),
                "lookup task ended without a result",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LookupPayload;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready};

    struct SlowSource {
        latency: Duration,
        fail: bool,
        calls: AtomicUsize,
    }

    impl SlowSource {
        fn new(latency: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                latency,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LookupSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch(&self, key: &LookupKey) -> Result<LookupPayload, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            if self.fail {
                return Err(TransportError::status(key.as_str(), 503));
            }
            Ok(LookupPayload {
                name: Some(key.to_string()),
                ..Default::default()
            })
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl LookupSource for PanickingSource {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn fetch(&self, _key: &LookupKey) -> Result<LookupPayload, TransportError> {
            panic!("source blew up");
        }
    }

    fn key(k: &str) -> LookupKey {
        LookupKey::new(k).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_done_false_until_settled() {
        let source = SlowSource::new(Duration::from_millis(200), false);
        let handle = LookupTask::start(source, key("octocat"), &LookupConfig::default());

        assert!(!handle.is_done());
        assert_eq!(handle.state(), TaskState::Pending);
        assert!(handle.settled_at().is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_done());

        let result = handle.get().await.unwrap();
        assert!(handle.is_done());
        assert_eq!(result.key.as_str(), "octocat");
        assert_eq!(result.source, "slow");
        assert!(result.fetch_duration >= Duration::from_millis(200));
        assert!(result.fetch_duration < Duration::from_millis(250));
        assert!(handle.settled_at().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_at_is_fixed_when_the_task_finishes() {
        let started = Instant::now();
        let source = SlowSource::new(Duration::from_millis(100), false);
        let handle = LookupTask::start(source, key("octocat"), &LookupConfig::default());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        handle.get().await.unwrap();

        let settled = handle.settled_at().unwrap().duration_since(started);
        assert!(settled >= Duration::from_millis(100));
        assert!(settled < Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_is_pending_before_completion() {
        let source = SlowSource::new(Duration::from_millis(50), false);
        let handle = LookupTask::start(source, key("octocat"), &LookupConfig::default());

        let mut get = tokio_test::task::spawn(handle.get());
        assert_pending!(get.poll());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(get.is_woken());
        let result = assert_ready!(get.poll());
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_does_not_refetch() {
        let source = SlowSource::new(Duration::from_millis(10), false);
        let handle = LookupTask::start(source.clone(), key("octocat"), &LookupConfig::default());

        let first = handle.get().await.unwrap();
        let second = handle.clone().get().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_surfaces_transport_error() {
        let source = SlowSource::new(Duration::from_millis(10), true);
        let handle = LookupTask::start(source, key("B"), &LookupConfig::default());

        let err = handle.get().await.unwrap_err();
        assert_eq!(err, TransportError::status("B", 503));
        assert!(matches!(handle.state(), TaskState::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failed_state() {
        let source = SlowSource::new(Duration::from_secs(30), false);
        let config = LookupConfig::default().with_task_timeout(Duration::from_secs(1));
        let handle = LookupTask::start(source, key("sloth"), &config);

        let err = handle.get().await.unwrap_err();
        assert_eq!(err, TransportError::timeout("sloth", Duration::from_secs(1)));
        assert!(handle.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_latency_follows_fetch() {
        let source = SlowSource::new(Duration::from_millis(300), false);
        let config = LookupConfig::default().with_simulated_latency(Duration::from_millis(1000));
        let handle = LookupTask::start(source, key("octocat"), &config);

        let result = handle.get().await.unwrap();
        assert!(result.fetch_duration >= Duration::from_millis(1300));
        assert!(result.fetch_duration < Duration::from_millis(1350));
    }

    #[tokio::test]
    async fn test_panicking_source_does_not_hang_waiters() {
        let handle = LookupTask::start(
            Arc::new(PanickingSource),
            key("boom"),
            &LookupConfig::default(),
        );

        let err = handle.get().await.unwrap_err();
        assert!(matches!(err, TransportError::Internal { .. }));
        assert_eq!(err.key(), "boom");
        assert!(handle.settled_at().is_none());
    }

    #[test]
    fn test_settle_only_once() {
        let (tx, rx) = watch::channel(TaskState::Pending);
        let first = TaskState::Failed(TransportError::status("A", 500));
        let second = TaskState::Failed(TransportError::status("A", 404));

        assert!(settle(&tx, first.clone()));
        assert!(!settle(&tx, second));
        assert_eq!(*rx.borrow(), first);
    }
}
