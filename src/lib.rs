//! # graphiti-monitor
//!
//! Keeps a best-effort connectivity signal for a Graphiti MCP upstream.
//! A [`ConnectivityManager`] runs an injected check, retries at a fixed
//! interval, drops a `ping.json` recovery marker once retries are exhausted,
//! and resumes after a cool-down. It never gives up and never returns an
//! error to its caller; everything it learns is exposed through
//! [`ConnectivityManager::get_status`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use graphiti_monitor::{ConnectivityManager, GraphitiError};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let manager = ConnectivityManager::with_defaults(|| async {
//!     // call the MCP server here
//!     Ok::<_, GraphitiError>(true)
//! });
//!
//! manager.start().await;
//! println!("{}", serde_json::to_string(&manager.get_status()).unwrap());
//! manager.stop();
//! # }
//! ```
//!
//! ## Probing over HTTP
//!
//! ```rust,no_run
//! use graphiti_monitor::{ConnectivityManager, HttpProbe, ProbeConfig, RetryConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> graphiti_monitor::Result<()> {
//! let probe = HttpProbe::new(ProbeConfig::new("http://localhost:8000"))?;
//! let manager = ConnectivityManager::new(RetryConfig::default(), probe);
//! manager.start().await;
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod config;
pub mod error;
pub mod manager;
pub mod probe;
pub mod recovery;
pub mod status;

use once_cell::sync::OnceCell;
use std::sync::Arc;

pub use check::{always_connected, CheckFuture, ConnectivityCheck};
pub use config::{MonitorConfig, ProbeConfig, RetryConfig};
pub use error::{GraphitiError, Result};
pub use manager::{ConnectivityManager, TimerKind};
pub use probe::HttpProbe;
pub use recovery::{write_ping_marker, PingMarker};
pub use status::ConnectionStatus;

static GLOBAL_CONNECTIVITY_MANAGER: OnceCell<Arc<ConnectivityManager>> = OnceCell::new();

/// Register the process-wide manager (called once at startup). Later calls are ignored.
pub fn set_global_manager(manager: Arc<ConnectivityManager>) {
    let _ = GLOBAL_CONNECTIVITY_MANAGER.set(manager);
}

pub fn get_global_manager() -> Option<Arc<ConnectivityManager>> {
    GLOBAL_CONNECTIVITY_MANAGER.get().map(Arc::clone)
}
