use graphiti_monitor::{CheckFuture, ConnectivityCheck, RetryConfig};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Check that replays a fixed list of outcomes, then repeats `fallback` forever.
#[derive(Clone)]
pub struct ScriptedCheck {
    inner: Arc<ScriptInner>,
}

struct ScriptInner {
    outcomes: Mutex<VecDeque<bool>>,
    fallback: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedCheck {
    pub fn new(outcomes: &[bool], fallback: bool) -> Self {
        Self {
            inner: Arc::new(ScriptInner {
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
                fallback: AtomicBool::new(fallback),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn always(ok: bool) -> Self {
        Self::new(&[], ok)
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn set_fallback(&self, ok: bool) {
        self.inner.fallback.store(ok, Ordering::SeqCst);
    }
}

impl ConnectivityCheck for ScriptedCheck {
    fn check(&self) -> CheckFuture<'_> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .inner
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.inner.fallback.load(Ordering::SeqCst));
        Box::pin(async move { Ok(next) })
    }
}

pub fn retry_config(
    ping_dir: &Path,
    max_attempts: u32,
    interval_seconds: u64,
    cool_down_ms: u64,
) -> RetryConfig {
    RetryConfig {
        max_attempts,
        interval_seconds,
        group_id: "screengraph-vibe".to_string(),
        cool_down_ms_after_max: cool_down_ms,
        ping_file_dir: Some(ping_dir.to_path_buf()),
    }
}

/// Let paused time run forward; timers due in the window fire before this returns.
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
