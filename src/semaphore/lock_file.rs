// ABOUTME: Lock-file based Semaphore with stale and abandoned lock reclamation.
// ABOUTME: Polls with a bounded interval until the caller's timeout elapses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::file_lock::{FileLock, LockState};
use super::lock_io::{FsLockIo, LockIo};
use super::process::{ProcessFinder, SystemProcessFinder};
use super::{Semaphore, SemaphoreError, SemaphoreGuard};
use crate::fs::FileSystem;
use crate::retry::{LimitedExponentialRetryInterval, RetryTracker};

const DEFAULT_ABANDON_AFTER: Duration = Duration::from_secs(5 * 60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of inspecting the current lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireLockAction {
    DontAcquire,
    Acquire,
    /// Delete the existing lock file first.
    ForciblyAcquire,
}

enum Attempt {
    Busy,
    Acquired,
    /// The file already names us as holder.
    Reentered,
}

pub struct LockFileSemaphore {
    io: Arc<dyn LockIo>,
    processes: Arc<dyn ProcessFinder>,
    abandon_after: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for LockFileSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockFileSemaphore")
            .field("abandon_after", &self.abandon_after)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl LockFileSemaphore {
    pub fn new(io: Arc<dyn LockIo>, processes: Arc<dyn ProcessFinder>) -> Self {
        Self {
            io,
            processes,
            abandon_after: DEFAULT_ABANDON_AFTER,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Lock files under `directory`, liveness from the OS process table.
    pub fn in_directory(fs: Arc<dyn FileSystem>, directory: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(FsLockIo::new(fs, directory)),
            Arc::new(SystemProcessFinder),
        )
    }

    /// Age after which a held or unreadable lock is considered abandoned.
    pub fn with_abandon_after(mut self, abandon_after: Duration) -> Self {
        self.abandon_after = abandon_after;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Decide whether `ours` may take the lock given what the file says.
    pub fn should_acquire_lock(
        &self,
        state: &LockState,
        ours: &FileLock,
        now: DateTime<Utc>,
    ) -> AcquireLockAction {
        let abandon_after =
            chrono::Duration::from_std(self.abandon_after).unwrap_or(chrono::Duration::MAX);

        match state {
            LockState::Missing => AcquireLockAction::Acquire,
            LockState::Inaccessible => AcquireLockAction::DontAcquire,
            LockState::Unreadable { modified } => {
                if now - *modified > abandon_after {
                    tracing::warn!(
                        "Lock file existed but was not readable, and has existed for longer than {:?}. Taking lock.",
                        self.abandon_after
                    );
                    AcquireLockAction::ForciblyAcquire
                } else {
                    AcquireLockAction::DontAcquire
                }
            }
            LockState::Held(holder) => {
                if holder.is_same_holder(ours) {
                    return AcquireLockAction::Acquire;
                }

                if holder.hostname == ours.hostname
                    && !self.processes.is_running(holder.process_id)
                {
                    tracing::warn!(
                        "Process {} ({}) had lock, but appears to have crashed. Taking lock.",
                        holder.process_id,
                        holder.process_name
                    );
                    return AcquireLockAction::ForciblyAcquire;
                }

                if (now - holder.acquired_at).abs() > abandon_after {
                    tracing::warn!(
                        "Forcibly taking lock from process {} on {} as it has been held since {}",
                        holder.process_id,
                        holder.hostname,
                        holder.acquired_at
                    );
                    return AcquireLockAction::ForciblyAcquire;
                }

                AcquireLockAction::DontAcquire
            }
        }
    }

    fn try_acquire(&self, path: &Path, ours: &FileLock) -> Result<Attempt, SemaphoreError> {
        let state = self.io.read_lock(path);
        let created = match self.should_acquire_lock(&state, ours, Utc::now()) {
            AcquireLockAction::DontAcquire => false,
            AcquireLockAction::Acquire if matches!(state, LockState::Held(_)) => {
                return Ok(Attempt::Reentered);
            }
            AcquireLockAction::Acquire => self.io.create_lock(path, ours)?,
            AcquireLockAction::ForciblyAcquire => {
                // Someone else may have reclaimed it between our read and now.
                // The re-read narrows that window but cannot close it: two
                // reclaimers that both re-read before either deletes can still
                // end up both believing they hold the lock.
                if self.io.read_lock(path) != state {
                    return Ok(Attempt::Busy);
                }
                self.io.delete_lock(path)?;
                self.io.create_lock(path, ours)?
            }
        };
        Ok(if created {
            Attempt::Acquired
        } else {
            Attempt::Busy
        })
    }
}

#[async_trait]
impl Semaphore for LockFileSemaphore {
    async fn acquire(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<SemaphoreGuard, SemaphoreError> {
        let path = self.io.lock_path(name);
        let ours = FileLock::for_current_process();
        let interval = LimitedExponentialRetryInterval::new(
            self.poll_interval,
            self.poll_interval.saturating_mul(2),
            2.0,
        );
        let mut tracker = RetryTracker::new(None, Some(timeout), Arc::new(interval));

        loop {
            match self.try_acquire(&path, &ours)? {
                Attempt::Acquired => {
                    tracing::debug!("Acquired lock '{}' at {}", name, path.display());
                    let io = self.io.clone();
                    return Ok(SemaphoreGuard::new(name, move || {
                        release(io.as_ref(), &path, &ours)
                    }));
                }
                Attempt::Reentered => {
                    tracing::debug!("Re-entered lock '{}' already held by this owner", name);
                    return Ok(SemaphoreGuard::reentered(name));
                }
                Attempt::Busy => {}
            }

            if !tracker.try_attempt() {
                return Err(SemaphoreError::Timeout {
                    name: name.to_string(),
                    waited: tracker.elapsed(),
                });
            }
            if tracker.should_log_warning() {
                tracing::debug!("Waiting for lock '{}'", name);
            }
            tokio::time::sleep(tracker.current_interval()).await;
            tracker.mark_failure();
        }
    }
}

fn release(io: &dyn LockIo, path: &Path, ours: &FileLock) {
    match io.read_lock(path) {
        LockState::Held(holder) if holder.is_same_holder(ours) => {
            if let Err(e) = io.delete_lock(path) {
                tracing::warn!("Failed to release lock {}: {}", path.display(), e);
            }
        }
        LockState::Missing => {}
        _ => tracing::warn!(
            "Lock {} was taken over by another process before release",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFileSystem;
    use crate::semaphore::as_lock_owner;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeProcesses(HashSet<u32>);

    impl ProcessFinder for FakeProcesses {
        fn is_running(&self, process_id: u32) -> bool {
            self.0.contains(&process_id)
        }
    }

    fn semaphore(running: &[u32]) -> LockFileSemaphore {
        let fs = Arc::new(InMemoryFileSystem::new());
        LockFileSemaphore::new(
            Arc::new(FsLockIo::new(fs, "/locks")),
            Arc::new(FakeProcesses(running.iter().copied().collect())),
        )
        .with_abandon_after(Duration::from_secs(60))
    }

    fn holder(pid: u32, acquired_at: DateTime<Utc>) -> FileLock {
        let mut lock = FileLock::for_current_process();
        lock.process_id = pid;
        lock.acquired_at = acquired_at;
        lock
    }

    #[test]
    fn missing_lock_is_acquired() {
        let sem = semaphore(&[]);
        let ours = FileLock::for_current_process();
        assert_eq!(
            sem.should_acquire_lock(&LockState::Missing, &ours, Utc::now()),
            AcquireLockAction::Acquire
        );
    }

    #[test]
    fn inaccessible_lock_is_not_acquired() {
        let sem = semaphore(&[]);
        let ours = FileLock::for_current_process();
        assert_eq!(
            sem.should_acquire_lock(&LockState::Inaccessible, &ours, Utc::now()),
            AcquireLockAction::DontAcquire
        );
    }

    #[test]
    fn fresh_unreadable_lock_is_contested() {
        let sem = semaphore(&[]);
        let ours = FileLock::for_current_process();
        let now = Utc::now();
        let state = LockState::Unreadable {
            modified: now - chrono::Duration::seconds(10),
        };
        assert_eq!(
            sem.should_acquire_lock(&state, &ours, now),
            AcquireLockAction::DontAcquire
        );
    }

    #[test]
    fn old_unreadable_lock_is_reclaimed() {
        let sem = semaphore(&[]);
        let ours = FileLock::for_current_process();
        let now = Utc::now();
        let state = LockState::Unreadable {
            modified: now - chrono::Duration::seconds(61),
        };
        assert_eq!(
            sem.should_acquire_lock(&state, &ours, now),
            AcquireLockAction::ForciblyAcquire
        );
    }

    #[test]
    fn own_lock_is_reentrant() {
        let sem = semaphore(&[]);
        let ours = FileLock::for_current_process();
        assert_eq!(
            sem.should_acquire_lock(&LockState::Held(ours.clone()), &ours, Utc::now()),
            AcquireLockAction::Acquire
        );
    }

    #[test]
    fn dead_holder_is_reclaimed_before_abandonment() {
        let sem = semaphore(&[]);
        let ours = FileLock::for_current_process();
        let now = Utc::now();
        let state = LockState::Held(holder(4242, now));
        assert_eq!(
            sem.should_acquire_lock(&state, &ours, now),
            AcquireLockAction::ForciblyAcquire
        );
    }

    #[test]
    fn live_holder_blocks_until_abandoned() {
        let sem = semaphore(&[4242]);
        let ours = FileLock::for_current_process();
        let now = Utc::now();

        let fresh = LockState::Held(holder(4242, now - chrono::Duration::seconds(30)));
        assert_eq!(
            sem.should_acquire_lock(&fresh, &ours, now),
            AcquireLockAction::DontAcquire
        );

        let abandoned = LockState::Held(holder(4242, now - chrono::Duration::seconds(120)));
        assert_eq!(
            sem.should_acquire_lock(&abandoned, &ours, now),
            AcquireLockAction::ForciblyAcquire
        );
    }

    #[test]
    fn holder_on_other_host_is_not_checked_for_liveness() {
        let sem = semaphore(&[]);
        let ours = FileLock::for_current_process();
        let now = Utc::now();
        let mut remote = holder(4242, now);
        remote.hostname = format!("{}-other", ours.hostname);
        assert_eq!(
            sem.should_acquire_lock(&LockState::Held(remote), &ours, now),
            AcquireLockAction::DontAcquire
        );
    }

    #[tokio::test]
    async fn guard_drop_releases_lock() {
        let sem = semaphore(&[std::process::id()]).with_poll_interval(Duration::from_millis(5));

        let guard = sem.acquire("journal", Duration::from_secs(1)).await.unwrap();
        let path = sem.io.lock_path("journal");
        assert!(matches!(sem.io.read_lock(&path), LockState::Held(_)));

        drop(guard);
        assert_eq!(sem.io.read_lock(&path), LockState::Missing);
    }

    #[tokio::test]
    async fn second_acquirer_times_out_while_held() {
        let sem = semaphore(&[std::process::id()]).with_poll_interval(Duration::from_millis(5));

        let _held = sem.acquire("journal", Duration::from_secs(1)).await.unwrap();
        let err = sem
            .acquire("journal", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SemaphoreError::Timeout { .. }));
    }

    #[tokio::test]
    async fn release_leaves_a_lock_taken_over_by_someone_else() {
        let sem = semaphore(&[std::process::id()]).with_poll_interval(Duration::from_millis(5));

        let guard = sem.acquire("journal", Duration::from_secs(1)).await.unwrap();
        let path = sem.io.lock_path("journal");
        let usurper = FileLock::for_current_process();
        sem.io.delete_lock(&path).unwrap();
        assert!(sem.io.create_lock(&path, &usurper).unwrap());

        guard.release();
        assert_eq!(sem.io.read_lock(&path), LockState::Held(usurper));
    }

    #[tokio::test]
    async fn nested_acquire_by_the_same_owner_reenters() {
        let sem = semaphore(&[std::process::id()]).with_poll_interval(Duration::from_millis(5));
        let path = sem.io.lock_path("journal");

        as_lock_owner(async {
            let outer = sem.acquire("journal", Duration::from_secs(1)).await.unwrap();
            let inner = sem
                .acquire("journal", Duration::from_millis(50))
                .await
                .unwrap();

            drop(inner);
            assert!(matches!(sem.io.read_lock(&path), LockState::Held(_)));
            drop(outer);
        })
        .await;

        assert_eq!(sem.io.read_lock(&path), LockState::Missing);
    }

    #[tokio::test]
    async fn different_owners_do_not_reenter() {
        let sem = semaphore(&[std::process::id()]).with_poll_interval(Duration::from_millis(5));

        let _held = as_lock_owner(sem.acquire("journal", Duration::from_secs(1)))
            .await
            .unwrap();
        let err = as_lock_owner(sem.acquire("journal", Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, SemaphoreError::Timeout { .. }));
    }

    /// Serves a stale view on the first read, then the real file.
    struct StaleFirstRead {
        inner: FsLockIo,
        stale: LockState,
        served: AtomicBool,
    }

    impl LockIo for StaleFirstRead {
        fn lock_path(&self, name: &str) -> PathBuf {
            self.inner.lock_path(name)
        }

        fn read_lock(&self, path: &Path) -> LockState {
            if !self.served.swap(true, Ordering::SeqCst) {
                return self.stale.clone();
            }
            self.inner.read_lock(path)
        }

        fn create_lock(&self, path: &Path, lock: &FileLock) -> Result<bool, SemaphoreError> {
            self.inner.create_lock(path, lock)
        }

        fn delete_lock(&self, path: &Path) -> Result<(), SemaphoreError> {
            self.inner.delete_lock(path)
        }
    }

    #[test]
    fn forced_reclaim_backs_off_when_the_lock_changed_hands() {
        let fs = Arc::new(InMemoryFileSystem::new());
        let inner = FsLockIo::new(fs, "/locks");
        let path = inner.lock_path("journal");
        let now = Utc::now();

        let fresh = holder(7, now);
        assert!(inner.create_lock(&path, &fresh).unwrap());

        let io = StaleFirstRead {
            inner,
            stale: LockState::Held(holder(4242, now)),
            served: AtomicBool::new(false),
        };
        let sem = LockFileSemaphore::new(Arc::new(io), Arc::new(FakeProcesses([7].into())));

        let ours = FileLock::for_current_process();
        assert!(matches!(sem.try_acquire(&path, &ours).unwrap(), Attempt::Busy));
        assert_eq!(sem.io.read_lock(&path), LockState::Held(fresh));
    }
}
