//! 资源池 - 固定数量的重量级执行句柄（浏览器实例）
//!
//! 所有句柄在构造时一次性创建，按槽位取用，运行结束时统一释放。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{AppError, ConfigError, PoolError};

/// 可放入资源池的句柄
#[async_trait]
pub trait PoolResource: Send + Sync + 'static {
    /// 关闭底层资源
    async fn close(&self) -> Result<()>;
}

/// 按槽位创建句柄
#[async_trait]
pub trait HandleLauncher: Send + Sync {
    type Handle: PoolResource;

    async fn launch(&self, slot: usize) -> Result<Self::Handle>;
}

/// 固定大小的资源池
pub struct ResourcePool<H: PoolResource> {
    handles: Vec<Arc<H>>,
    released: AtomicBool,
}

impl<H: PoolResource> ResourcePool<H> {
    /// 依次启动 `size` 个句柄；任一失败时关闭已启动的句柄后返回错误
    pub async fn launch<L>(size: usize, launcher: &L) -> Result<Self, AppError>
    where
        L: HandleLauncher<Handle = H>,
    {
        if size == 0 {
            return Err(ConfigError::InvalidPoolSize { size }.into());
        }

        let mut handles = Vec::with_capacity(size);
        for slot in 0..size {
            match launcher.launch(slot).await {
                Ok(handle) => handles.push(Arc::new(handle)),
                Err(e) => {
                    let partial = Self {
                        handles,
                        released: AtomicBool::new(false),
                    };
                    partial.release_all().await;
                    return Err(AppError::Other(e.context(format!("启动槽位 {} 失败", slot))));
                }
            }
        }

        info!("✓ 资源池已就绪，共 {} 个句柄", size);
        Ok(Self {
            handles,
            released: AtomicBool::new(false),
        })
    }

    /// 由已有句柄构造
    pub fn from_handles(handles: Vec<H>) -> Result<Self, ConfigError> {
        if handles.is_empty() {
            return Err(ConfigError::InvalidPoolSize { size: 0 });
        }
        Ok(Self {
            handles: handles.into_iter().map(Arc::new).collect(),
            released: AtomicBool::new(false),
        })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// 取出槽位上已存在的句柄（不会按需创建）
    pub fn acquire_handle(&self, slot: usize) -> Result<Arc<H>, PoolError> {
        if self.is_released() {
            return Err(PoolError::Released);
        }
        self.handles
            .get(slot)
            .cloned()
            .ok_or(PoolError::SlotOutOfRange {
                slot,
                size: self.handles.len(),
            })
    }

    /// 关闭所有句柄；重复调用不做任何事
    pub async fn release_all(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        for (slot, handle) in self.handles.iter().enumerate() {
            if let Err(e) = handle.close().await {
                warn!("⚠️ 关闭槽位 {} 的句柄失败: {}", slot, e);
            }
        }
        info!("🧹 资源池已释放 ({} 个句柄)", self.handles.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingHandle {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PoolResource for CountingHandle {
        async fn close(&self) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FlakyLauncher {
        fail_at: usize,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HandleLauncher for FlakyLauncher {
        type Handle = CountingHandle;

        async fn launch(&self, slot: usize) -> Result<CountingHandle> {
            if slot == self.fail_at {
                anyhow::bail!("no chrome");
            }
            Ok(CountingHandle {
                closed: self.closed.clone(),
            })
        }
    }

    #[test]
    fn test_acquire_handle_bounds() {
        let pool = ResourcePool::from_handles(vec![CountingHandle::default(), CountingHandle::default()]).unwrap();
        assert_eq!(pool.size(), 2);
        assert!(pool.acquire_handle(1).is_ok());
        assert_eq!(
            pool.acquire_handle(2).err(),
            Some(PoolError::SlotOutOfRange { slot: 2, size: 2 })
        );
    }

    #[test]
    fn test_acquire_returns_same_handle() {
        let pool = ResourcePool::from_handles(vec![CountingHandle::default()]).unwrap();
        let a = pool.acquire_handle(0).unwrap();
        let b = pool.acquire_handle(0).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_empty_pool_rejected() {
        let result = ResourcePool::<CountingHandle>::from_handles(Vec::new());
        assert_eq!(result.err(), Some(ConfigError::InvalidPoolSize { size: 0 }));
    }

    #[tokio::test]
    async fn test_release_all_is_idempotent() {
        let closed = Arc::new(AtomicUsize::new(0));
        let handles = (0..3)
            .map(|_| CountingHandle {
                closed: closed.clone(),
            })
            .collect();
        let pool = ResourcePool::from_handles(handles).unwrap();

        pool.release_all().await;
        pool.release_all().await;

        assert_eq!(closed.load(Ordering::SeqCst), 3);
        assert_eq!(pool.acquire_handle(0).err(), Some(PoolError::Released));
    }

    #[tokio::test]
    async fn test_failed_launch_closes_started_handles() {
        let closed = Arc::new(AtomicUsize::new(0));
        let launcher = FlakyLauncher {
            fail_at: 2,
            closed: closed.clone(),
        };
        let result = ResourcePool::launch(4, &launcher).await;
        assert!(result.is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_launch_zero_rejected() {
        let launcher = FlakyLauncher {
            fail_at: usize::MAX,
            closed: Arc::new(AtomicUsize::new(0)),
        };
        let result = ResourcePool::launch(0, &launcher).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::InvalidPoolSize { size: 0 }))
        ));
    }
}
