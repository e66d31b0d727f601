//! Scheduler - 주기 작업 관리
//!
//! 애드온이 등록하는 주기 콜백을 tokio 태스크로 실행합니다.
//! 애드온 비활성화 시 `remove_job`으로 취소됩니다.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::debug;

/// 주기 작업 콜백
pub type Job = Arc<dyn Fn() + Send + Sync>;

/// 등록된 작업 핸들
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(u64);

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// 스케줄러 계약
pub trait Scheduler: Send + Sync {
    /// 주기 작업 등록
    fn add_job(&self, interval: Duration, job: Job) -> Result<JobHandle>;

    /// 작업 취소. 실제로 취소된 경우 true
    fn remove_job(&self, handle: JobHandle) -> bool;

    /// 대기 중인 작업 수
    fn job_count(&self) -> usize;
}

// ============================================================================
// JobScheduler - tokio 기반 구현
// ============================================================================

/// tokio interval 기반 스케줄러
#[derive(Default)]
pub struct JobScheduler {
    jobs: Mutex<HashMap<JobHandle, AbortHandle>>,
    counter: AtomicU64,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for JobScheduler {
    fn add_job(&self, interval: Duration, job: Job) -> Result<JobHandle> {
        if interval.is_zero() {
            return Err(Error::Scheduler("job interval must be non-zero".into()));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Scheduler(format!("no tokio runtime available: {}", e)))?;

        let handle = JobHandle(self.counter.fetch_add(1, Ordering::SeqCst));
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 첫 tick은 즉시 완료되므로 건너뜀
            ticker.tick().await;
            loop {
                ticker.tick().await;
                job();
            }
        });

        self.jobs.lock().insert(handle, task.abort_handle());
        debug!(job = %handle, ?interval, "Scheduled periodic job");
        Ok(handle)
    }

    fn remove_job(&self, handle: JobHandle) -> bool {
        match self.jobs.lock().remove(&handle) {
            Some(task) => {
                task.abort();
                debug!(job = %handle, "Removed periodic job");
                true
            }
            None => false,
        }
    }

    fn job_count(&self) -> usize {
        self.jobs.lock().len()
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        for (_, task) in self.jobs.get_mut().drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_add_and_remove_job() {
        let scheduler = JobScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);

        let handle = scheduler
            .add_job(
                Duration::from_millis(5),
                Arc::new(move || {
                    inner.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert_eq!(scheduler.job_count(), 1);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(count.load(Ordering::SeqCst) > 0);

        assert!(scheduler.remove_job(handle));
        assert!(!scheduler.remove_job(handle));
        assert_eq!(scheduler.job_count(), 0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let after = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), after);
    }

    #[test]
    fn test_add_job_without_runtime() {
        let scheduler = JobScheduler::new();
        let result = scheduler.add_job(Duration::from_secs(1), Arc::new(|| {}));
        assert!(matches!(result, Err(Error::Scheduler(_))));
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let scheduler = JobScheduler::new();
        let result = scheduler.add_job(Duration::ZERO, Arc::new(|| {}));
        assert!(matches!(result, Err(Error::Scheduler(_))));
    }
}
