use crate::check::ConnectivityCheck;
use crate::config::RetryConfig;
use crate::recovery::write_ping_marker;
use crate::status::ConnectionStatus;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

pub const CHECK_RETURNED_FALSE: &str = "Connectivity check returned false";
pub const UNKNOWN_ERROR: &str = "Unknown error";

type Cycle = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Which delay the manager is currently waiting out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Retry,
    CoolDown,
}

/// Keeps a best-effort connectivity signal for one upstream.
///
/// Failed checks are retried every `interval_seconds` until `max_attempts`
/// consecutive failures, then a `ping.json` marker is dropped and checking
/// resumes from zero after `cool_down_ms_after_max`. A successful check
/// leaves the manager idle until `start` or `reset_after_manual_fix` is
/// called again.
pub struct ConnectivityManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: RetryConfig,
    check: Box<dyn ConnectivityCheck>,
    state: Mutex<ConnectionState>,
}

#[derive(Default)]
struct ConnectionState {
    is_connected: bool,
    current_attempt: u32,
    last_error: Option<String>,
    pending: Option<PendingTimer>,
    /// Bumped by start/stop/reset; completions tagged with an older epoch are dropped.
    epoch: u64,
    next_timer_id: u64,
}

struct PendingTimer {
    id: u64,
    kind: TimerKind,
    handle: JoinHandle<()>,
}

impl ConnectionState {
    fn cancel_pending(&mut self) {
        if let Some(timer) = self.pending.take() {
            tracing::debug!("[GRAPHITI] cancelling pending {:?} timer", timer.kind);
            timer.handle.abort();
        }
    }

    fn begin_cycle(&mut self) -> u64 {
        self.cancel_pending();
        self.epoch += 1;
        self.epoch
    }
}

impl ConnectivityManager {
    pub fn new(config: RetryConfig, check: impl ConnectivityCheck) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                check: Box::new(check),
                state: Mutex::new(ConnectionState::default()),
            }),
        }
    }

    /// Manager with the stock policy: 4 attempts, 30 s apart, 2 minute cool-down.
    pub fn with_defaults(check: impl ConnectivityCheck) -> Self {
        Self::new(RetryConfig::default(), check)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.inner.config
    }

    /// Run a check now. Returns once its outcome has been recorded and any
    /// follow-up timer scheduled; check failures never surface here.
    pub async fn start(&self) {
        let epoch = self.inner.lock_state().begin_cycle();
        tracing::info!(
            "[GRAPHITI] starting connectivity monitor for group {}",
            self.inner.config.group_id
        );
        Arc::clone(&self.inner).run_check(epoch).await;
    }

    /// Cancel the pending retry or cool-down. The last snapshot is kept as is.
    pub fn stop(&self) {
        let mut state = self.inner.lock_state();
        state.begin_cycle();
    }

    pub fn get_status(&self) -> ConnectionStatus {
        let state = self.inner.lock_state();
        ConnectionStatus {
            is_connected: state.is_connected,
            current_attempt: state.current_attempt,
            max_attempts: self.inner.config.max_attempts,
            last_error: state.last_error.clone(),
        }
    }

    /// Operator hook: forget previous failures and check immediately,
    /// skipping whatever retry or cool-down was pending.
    pub async fn reset_after_manual_fix(&self) {
        let epoch = {
            let mut state = self.inner.lock_state();
            state.current_attempt = 0;
            state.begin_cycle()
        };
        tracing::info!("[GRAPHITI] manual fix reported, re-checking now");
        Arc::clone(&self.inner).run_check(epoch).await;
    }

    pub fn pending_timer(&self) -> Option<TimerKind> {
        self.inner
            .lock_state()
            .pending
            .as_ref()
            .map(|timer| timer.kind)
    }
}

impl Drop for ConnectivityManager {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run_check(self: Arc<Self>, epoch: u64) -> Cycle {
        Box::pin(async move {
            let failure = match self.check.check().await {
                Ok(true) => None,
                Ok(false) => Some(CHECK_RETURNED_FALSE.to_string()),
                Err(e) => {
                    let message = e.to_string();
                    if message.is_empty() {
                        Some(UNKNOWN_ERROR.to_string())
                    } else {
                        Some(message)
                    }
                }
            };

            {
                let mut state = self.lock_state();
                if state.epoch != epoch {
                    tracing::debug!("[GRAPHITI] discarding result of a cancelled check");
                    return;
                }

                let Some(message) = failure else {
                    if !state.is_connected {
                        tracing::info!("[GRAPHITI] connected");
                    }
                    state.is_connected = true;
                    state.current_attempt = 0;
                    state.last_error = None;
                    return;
                };

                state.is_connected = false;
                state.current_attempt = state.current_attempt.saturating_add(1);
                tracing::warn!(
                    "[GRAPHITI] connectivity check failed (attempt {}/{}): {}",
                    state.current_attempt,
                    self.config.max_attempts,
                    message
                );
                state.last_error = Some(message);

                if state.current_attempt < self.config.max_attempts {
                    self.schedule(&mut state, TimerKind::Retry, epoch);
                    return;
                }

                // Marker and cool-down happen under the lock: a concurrent
                // stop/reset observes both or neither.
                tracing::error!(
                    "[GRAPHITI] {} consecutive failures, writing recovery marker and cooling down for {} ms",
                    self.config.max_attempts,
                    self.config.cool_down_ms_after_max
                );
                self.attempt_recovery_action();
                self.schedule(&mut state, TimerKind::CoolDown, epoch);
            }
        })
    }

    fn schedule(self: &Arc<Self>, state: &mut ConnectionState, kind: TimerKind, epoch: u64) {
        let delay = match kind {
            TimerKind::Retry => self.config.retry_interval(),
            TimerKind::CoolDown => self.config.cool_down(),
        };

        state.next_timer_id += 1;
        let id = state.next_timer_id;
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire(id, kind, epoch).await;
        });

        tracing::debug!("[GRAPHITI] {:?} scheduled in {:?}", kind, delay);
        if let Some(previous) = state.pending.replace(PendingTimer { id, kind, handle }) {
            previous.handle.abort();
        }
    }

    async fn fire(self: Arc<Self>, id: u64, kind: TimerKind, epoch: u64) {
        {
            let mut state = self.lock_state();
            let current = matches!(&state.pending, Some(timer) if timer.id == id);
            if !current || state.epoch != epoch {
                return;
            }
            // Detach rather than abort: this task is the one running.
            state.pending = None;
            if kind == TimerKind::CoolDown {
                state.current_attempt = 0;
            }
        }
        self.run_check(epoch).await;
    }

    /// Best effort: a failed write is logged and otherwise ignored.
    fn attempt_recovery_action(&self) {
        let dir = self.config.resolved_ping_dir();
        match write_ping_marker(&dir, &self.config.group_id) {
            Ok(path) => tracing::info!("[GRAPHITI] recovery marker written to {:?}", path),
            Err(e) => tracing::warn!(
                "[GRAPHITI] could not write recovery marker in {:?}: {}",
                dir,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphitiError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config_in(dir: &std::path::Path) -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            interval_seconds: 1,
            group_id: "unit".to_string(),
            cool_down_ms_after_max: 10,
            ping_file_dir: Some(dir.to_path_buf()),
        }
    }

    #[test]
    fn test_initial_state_is_at_rest() {
        let manager = ConnectivityManager::with_defaults(|| async { Ok::<_, GraphitiError>(true) });
        let status = manager.get_status();
        assert!(!status.is_connected);
        assert_eq!(status.current_attempt, 0);
        assert_eq!(status.max_attempts, 4);
        assert_eq!(status.last_error, None);
        assert_eq!(manager.pending_timer(), None);
        assert_eq!(manager.config(), &RetryConfig::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_false_result_records_fixed_message() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ConnectivityManager::new(config_in(temp_dir.path()), || async { Ok::<_, GraphitiError>(false) });

        manager.start().await;

        let status = manager.get_status();
        assert!(!status.is_connected);
        assert_eq!(status.current_attempt, 1);
        assert_eq!(status.last_error.as_deref(), Some(CHECK_RETURNED_FALSE));
        assert_eq!(manager.pending_timer(), Some(TimerKind::Retry));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_message_becomes_last_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ConnectivityManager::new(config_in(temp_dir.path()), || async {
            Err(GraphitiError::check("MCP tool call timed out"))
        });

        manager.start().await;

        assert_eq!(
            manager.get_status().last_error.as_deref(),
            Some("MCP tool call timed out")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_error_message_falls_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = ConnectivityManager::new(config_in(temp_dir.path()), || async {
            Err(GraphitiError::check(""))
        });

        manager.start().await;

        assert_eq!(manager.get_status().last_error.as_deref(), Some(UNKNOWN_ERROR));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_timer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let manager = ConnectivityManager::new(config_in(temp_dir.path()), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, GraphitiError>(false) }
        });

        manager.start().await;
        drop(manager);
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
