// ABOUTME: Cross-process named locks that serialize access to machine-level state.
// ABOUTME: Lock-file implementation lives behind the Semaphore trait.

mod file_lock;
mod lock_file;
mod lock_io;
mod process;

pub use file_lock::{FileLock, LockState};
pub use lock_file::{AcquireLockAction, LockFileSemaphore};
pub use lock_io::{FsLockIo, LockIo};
pub use process::{ProcessFinder, SystemProcessFinder};

use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::fs::FsError;

#[derive(Debug, thiserror::Error)]
pub enum SemaphoreError {
    #[error("timed out after {waited:?} waiting for lock '{name}'")]
    Timeout { name: String, waited: Duration },

    #[error("lock file {path} could not be written: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("failed to serialize lock holder: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SemaphoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SemaphoreError::Timeout { .. } => ErrorKind::Transient,
            SemaphoreError::Io { .. } | SemaphoreError::Serialize(_) => ErrorKind::Fatal,
        }
    }
}

tokio::task_local! {
    static LOCK_OWNER: Uuid;
}

/// Run `f` as a single lock owner.
///
/// Inside `f`, acquiring a lock this owner already holds re-enters it instead
/// of waiting. Outside any owner scope every acquisition is its own owner, so
/// separate tasks in one process still exclude each other.
pub async fn as_lock_owner<F: Future>(f: F) -> F::Output {
    if current_lock_owner().is_some() {
        return f.await;
    }
    LOCK_OWNER.scope(Uuid::new_v4(), f).await
}

pub(crate) fn current_lock_owner() -> Option<Uuid> {
    LOCK_OWNER.try_with(|owner| *owner).ok()
}

/// Mutual exclusion for a named resource across OS processes.
#[async_trait]
pub trait Semaphore: Send + Sync {
    /// Wait up to `timeout` for the named lock.
    async fn acquire(&self, name: &str, timeout: Duration)
    -> Result<SemaphoreGuard, SemaphoreError>;
}

/// A held lock. Released when dropped.
pub struct SemaphoreGuard {
    name: String,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl std::fmt::Debug for SemaphoreGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemaphoreGuard")
            .field("name", &self.name)
            .finish()
    }
}

impl SemaphoreGuard {
    pub fn new(name: impl Into<String>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            release: Some(Box::new(release)),
        }
    }

    /// A nested hold on a lock the same owner already has. Dropping it leaves
    /// the lock to the outer guard.
    pub fn reentered(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            release: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release now instead of at end of scope.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SemaphoreGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Run `f` while holding the named lock, as one lock owner.
pub async fn with_lock<S, F, Fut, T, E>(
    semaphore: &S,
    name: &str,
    timeout: Duration,
    f: F,
) -> Result<T, E>
where
    S: Semaphore + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<SemaphoreError>,
{
    as_lock_owner(async move {
        let _guard = semaphore.acquire(name, timeout).await?;
        f().await
    })
    .await
}
