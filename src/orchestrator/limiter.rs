//! 并发闸门 - 限制同时执行 agent 阶段的任务数
//!
//! 基于 `tokio::sync::Semaphore`（先进先出，不会饿死等待者）。
//! `enter()` 返回的许可在 drop 时归还，失败和 panic 路径同样会归还。

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ConfigError;

/// 并发闸门
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    permits: usize,
}

/// 一个已获得的许可，drop 时自动退出闸门
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    pub fn new(permits: usize) -> Result<Self, ConfigError> {
        if permits == 0 {
            return Err(ConfigError::InvalidPoolSize { size: 0 });
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            permits,
        })
    }

    /// 初始许可数
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// 当前空闲的许可数
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 等待直到获得许可
    pub async fn enter(&self) -> LimiterPermit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            // semaphore 从不 close，acquire 只会在 close 后失败
            .unwrap_or_else(|_| unreachable!("limiter semaphore closed"));
        LimiterPermit { _permit: permit }
    }
}
