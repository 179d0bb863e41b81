use crate::error::{GraphitiError, Result};
use std::future::Future;
use std::pin::Pin;

pub type CheckFuture<'a> = Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

/// Probe supplied by the host. `Ok(false)` and `Err(_)` both count as a failed check.
///
/// The manager imposes no timeout, so implementations should bound their own latency.
pub trait ConnectivityCheck: Send + Sync + 'static {
    fn check(&self) -> CheckFuture<'_>;
}

impl<F, Fut> ConnectivityCheck for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    fn check(&self) -> CheckFuture<'_> {
        Box::pin(self())
    }
}

/// Placeholder check that always reports the upstream as reachable.
pub fn always_connected() -> impl ConnectivityCheck {
    || async { Ok::<bool, GraphitiError>(true) }
}
