//! 槽位调度器 - 编排层
//!
//! 每个资源池槽位对应一个常驻 worker，worker 独占该槽位的句柄并按提交顺序执行任务。
//! 同一个句柄因此永远不会被两个任务同时使用；全局并发数再由 `ConcurrencyLimiter` 限制。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{AppError, ConfigError, PoolError};
use crate::orchestrator::limiter::ConcurrencyLimiter;
use crate::orchestrator::resource_pool::{PoolResource, ResourcePool};

/// 在某个槽位的句柄上执行的任务
pub type Job<H> = Box<dyn FnOnce(Arc<H>) -> BoxFuture<'static, ()> + Send>;

/// 槽位调度器
pub struct SlotScheduler<H: PoolResource> {
    queues: Vec<mpsc::UnboundedSender<Job<H>>>,
    workers: Vec<JoinHandle<()>>,
}

impl<H: PoolResource> SlotScheduler<H> {
    /// 为每个槽位启动一个 worker
    ///
    /// 许可数大于槽位数时拒绝启动
    pub fn start(pool: &ResourcePool<H>, limiter: ConcurrencyLimiter) -> Result<Self, AppError> {
        if limiter.permits() > pool.size() {
            return Err(ConfigError::LimiterExceedsPool {
                permits: limiter.permits(),
                pool_size: pool.size(),
            }
            .into());
        }

        let mut queues = Vec::with_capacity(pool.size());
        let mut workers = Vec::with_capacity(pool.size());
        for slot in 0..pool.size() {
            let handle = pool.acquire_handle(slot)?;
            let (tx, rx) = mpsc::unbounded_channel();
            queues.push(tx);
            workers.push(tokio::spawn(run_worker(slot, handle, rx, limiter.clone())));
        }

        debug!("调度器已启动: {} 个槽位, {} 个许可", pool.size(), limiter.permits());
        Ok(Self { queues, workers })
    }

    pub fn size(&self) -> usize {
        self.queues.len()
    }

    /// 把任务放入槽位队列，立即返回
    pub fn submit<F>(&self, slot: usize, job: F) -> Result<(), PoolError>
    where
        F: FnOnce(Arc<H>) -> BoxFuture<'static, ()> + Send + 'static,
    {
        let queue = self.queues.get(slot).ok_or(PoolError::SlotOutOfRange {
            slot,
            size: self.queues.len(),
        })?;
        queue.send(Box::new(job)).map_err(|_| PoolError::Released)
    }

    /// 关闭所有队列并等待 worker 执行完已提交的任务
    pub async fn shutdown(self) {
        let Self { queues, workers, .. } = self;
        drop(queues);
        for (slot, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                error!("[槽位 {}] worker 异常退出: {}", slot, e);
            }
        }
    }
}

async fn run_worker<H: PoolResource>(
    slot: usize,
    handle: Arc<H>,
    mut jobs: mpsc::UnboundedReceiver<Job<H>>,
    limiter: ConcurrencyLimiter,
) {
    while let Some(job) = jobs.recv().await {
        let _permit = limiter.enter().await;
        let fut = job(handle.clone());
        if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
            error!("[槽位 {}] ❌ 任务 panic，继续执行下一个任务", slot);
        }
    }
    debug!("[槽位 {}] worker 退出", slot);
}
