// ABOUTME: Holder metadata stored inside a lock file.
// ABOUTME: JSON with unknown fields ignored so other versions can read it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::current_lock_owner;

/// Who holds a lock and since when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLock {
    pub process_id: u32,
    #[serde(default)]
    pub process_name: String,
    #[serde(default)]
    pub hostname: String,
    /// Distinguishes lock owners inside one process.
    #[serde(default)]
    pub owner: Option<Uuid>,
    pub acquired_at: DateTime<Utc>,
}

impl FileLock {
    /// A holder record for the current process and lock owner.
    pub fn for_current_process() -> Self {
        Self {
            process_id: std::process::id(),
            process_name: current_process_name(),
            hostname: gethostname::gethostname().to_string_lossy().into_owned(),
            owner: Some(current_lock_owner().unwrap_or_else(Uuid::new_v4)),
            acquired_at: Utc::now(),
        }
    }

    /// Same process and same owner.
    pub fn is_same_holder(&self, other: &FileLock) -> bool {
        self.process_id == other.process_id
            && self.hostname == other.hostname
            && self.owner == other.owner
    }
}

fn current_process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

/// What a lock file currently says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Missing,
    /// Another process has the file open and it cannot be read right now.
    Inaccessible,
    /// The file exists but its contents do not parse.
    Unreadable { modified: DateTime<Utc> },
    Held(FileLock),
}
