//! 共用的發送工作池
//!
//! 同步、非同步與批次發送都從同一個 semaphore 取得 permit，
//! 所以同時進行中的 gateway 呼叫永遠不會超過池的大小。

use crate::utils::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 系統層級的同時發送上限（單一數據機）
pub const POOL_CEILING: usize = 10;
pub const DEFAULT_QUEUE_DEPTH: usize = 100;

#[derive(Debug)]
struct PoolInner {
    size: usize,
    queue_depth: usize,
    semaphore: Arc<Semaphore>,
    /// 已預約但尚未結束的發送（排隊中 + 執行中）
    pending: AtomicUsize,
    active: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOccupancy {
    pub size: usize,
    pub active: usize,
    pub waiting: usize,
    pub queue_depth: usize,
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// size 會被限制在 1..=POOL_CEILING
    pub fn new(size: usize, queue_depth: usize) -> Self {
        let size = size.clamp(1, POOL_CEILING);
        Self {
            inner: Arc::new(PoolInner {
                size,
                queue_depth,
                semaphore: Arc::new(Semaphore::new(size)),
                pending: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
            }),
        }
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    pub fn capacity(&self) -> usize {
        self.inner.size + self.inner.queue_depth
    }

    /// 批次請求實際使用的並行數：min(max_workers, size)，最少為 1
    pub fn effective_workers(&self, requested: usize) -> usize {
        requested.clamp(1, self.inner.size)
    }

    /// 預約一個位置；池已關閉或排隊中的數量超過上限時直接拒絕
    pub fn try_reserve(&self) -> Result<Reservation> {
        if self.is_closed() {
            return Err(DispatchError::PoolClosed);
        }
        let capacity = self.capacity();
        self.inner
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                (pending < capacity).then_some(pending + 1)
            })
            .map_err(|pending| {
                tracing::warn!(pending, capacity, "Worker pool at capacity, rejecting send");
                DispatchError::PoolSaturated { pending, capacity }
            })?;
        Ok(Reservation::new(Arc::clone(&self.inner)))
    }

    /// 呼叫端本身會等待結果時使用，不受佇列深度限制
    pub fn reserve(&self) -> Reservation {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        Reservation::new(Arc::clone(&self.inner))
    }

    pub fn occupancy(&self) -> PoolOccupancy {
        let active = self.inner.active.load(Ordering::SeqCst);
        let pending = self.inner.pending.load(Ordering::SeqCst);
        PoolOccupancy {
            size: self.inner.size,
            active,
            waiting: pending.saturating_sub(active),
            queue_depth: self.inner.queue_depth,
        }
    }

    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// 關閉後不再發出新的 permit，等待中的預約會得到 PoolClosed
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.semaphore.is_closed()
    }
}

/// 尚未取得 worker 的預約；drop 時釋放位置
#[derive(Debug)]
pub struct Reservation {
    inner: Arc<PoolInner>,
    handed_off: bool,
}

impl Reservation {
    fn new(inner: Arc<PoolInner>) -> Self {
        Self {
            inner,
            handed_off: false,
        }
    }

    pub async fn acquire(mut self) -> Result<WorkerGuard> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::PoolClosed)?;

        self.inner.active.fetch_add(1, Ordering::SeqCst);
        self.handed_off = true;

        Ok(WorkerGuard {
            inner: Arc::clone(&self.inner),
            _permit: permit,
        })
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.handed_off {
            self.inner.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// 持有期間佔用一個 worker
#[derive(Debug)]
pub struct WorkerGuard {
    inner: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
        self.inner.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_is_clamped_to_ceiling() {
        assert_eq!(WorkerPool::new(50, 0).size(), POOL_CEILING);
        assert_eq!(WorkerPool::new(0, 0).size(), 1);
        assert_eq!(WorkerPool::new(4, 0).size(), 4);
    }

    #[test]
    fn test_effective_workers_clamps_both_ends() {
        let pool = WorkerPool::new(POOL_CEILING, 0);
        assert_eq!(pool.effective_workers(0), 1);
        assert_eq!(pool.effective_workers(3), 3);
        assert_eq!(pool.effective_workers(25), POOL_CEILING);
    }

    #[tokio::test]
    async fn test_guard_tracks_occupancy() {
        let pool = WorkerPool::new(2, 0);

        let first = pool.reserve().acquire().await.unwrap();
        let waiting = pool.reserve();
        let occupancy = pool.occupancy();
        assert_eq!(occupancy.active, 1);
        assert_eq!(occupancy.waiting, 1);

        let second = waiting.acquire().await.unwrap();
        assert_eq!(pool.active(), 2);

        drop(first);
        drop(second);
        assert_eq!(
            pool.occupancy(),
            PoolOccupancy {
                size: 2,
                active: 0,
                waiting: 0,
                queue_depth: 0
            }
        );
    }

    #[tokio::test]
    async fn test_try_reserve_applies_backpressure() {
        let pool = WorkerPool::new(1, 1);

        let running = pool.try_reserve().unwrap().acquire().await.unwrap();
        let queued = pool.try_reserve().unwrap();

        assert!(matches!(
            pool.try_reserve(),
            Err(DispatchError::PoolSaturated { capacity: 2, .. })
        ));

        drop(queued);
        assert!(pool.try_reserve().is_ok());
        drop(running);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_acquire() {
        let pool = WorkerPool::new(1, 0);
        let reservation = pool.reserve();
        pool.close();

        assert!(pool.is_closed());
        assert!(matches!(
            reservation.acquire().await,
            Err(DispatchError::PoolClosed)
        ));
        assert_eq!(pool.occupancy().waiting, 0);
    }

    #[test]
    fn test_closed_pool_rejects_try_reserve() {
        let pool = WorkerPool::new(2, 10);
        pool.close();

        assert!(matches!(pool.try_reserve(), Err(DispatchError::PoolClosed)));
        assert_eq!(pool.occupancy().waiting, 0);
    }
}
