use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PING_FILE_NAME: &str = "ping.json";

/// Payload of `ping.json`, dropped when a target exhausts its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingMarker {
    pub ping_at: String,
    pub group_id: String,
}

impl PingMarker {
    pub fn now(group_id: &str) -> Self {
        Self {
            ping_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            group_id: group_id.to_string(),
        }
    }
}

/// Write `<dir>/ping.json`, creating `dir` if needed. Overwrites any previous marker.
pub fn write_ping_marker(dir: &Path, group_id: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(PING_FILE_NAME);
    let payload = serde_json::to_string(&PingMarker::now(group_id))?;
    std::fs::write(&path, payload)?;

    Ok(path)
}
