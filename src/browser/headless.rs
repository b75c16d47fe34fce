use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::infrastructure::JsExecutor;
use crate::models::profile::BrowserSettings;
use crate::orchestrator::resource_pool::{HandleLauncher, PoolResource};

/// 一个浏览器实例及其唯一的页面
///
/// 同一时刻只能被一个任务使用，由调度层保证
pub struct BrowserHandle {
    slot: usize,
    browser: Mutex<Browser>,
    executor: JsExecutor,
    events: JoinHandle<()>,
}

impl BrowserHandle {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn executor(&self) -> &JsExecutor {
        &self.executor
    }
}

#[async_trait]
impl PoolResource for BrowserHandle {
    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        browser.wait().await?;
        self.events.abort();
        debug!("[浏览器 {}] 已关闭", self.slot);
        Ok(())
    }
}

/// 按 `BrowserSettings` 启动浏览器
pub struct BrowserLauncher {
    settings: BrowserSettings,
}

impl BrowserLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl HandleLauncher for BrowserLauncher {
    type Handle = BrowserHandle;

    async fn launch(&self, slot: usize) -> Result<BrowserHandle> {
        launch_browser(slot, &self.settings).await
    }
}

/// 启动浏览器并打开一个空白页
pub async fn launch_browser(slot: usize, settings: &BrowserSettings) -> Result<BrowserHandle> {
    info!("🚀 [浏览器 {}] 启动中 (无头: {})...", slot, settings.headless);

    let mut builder = BrowserConfig::builder()
        .user_data_dir(std::env::temp_dir().join(format!("company_scout_profile_{}_{}", std::process::id(), slot)))
        .args(vec![
            "--disable-gpu",           // 无头模式下禁用 GPU
            "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage", // 防止共享内存不足
        ]);
    if settings.headless {
        builder = builder.new_headless_mode();
    } else {
        builder = builder.with_head();
    }
    if let Ok(path) = std::env::var("CHROME_PATH") {
        builder = builder.chrome_executable(PathBuf::from(path));
    }
    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow::anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("[浏览器 {}] 启动失败: {}", slot, e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;

    // 在后台处理浏览器事件
    let events = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("[浏览器 {}] 创建页面失败: {}", slot, e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    info!("✅ [浏览器 {}] 已就绪", slot);

    Ok(BrowserHandle {
        slot,
        browser: Mutex::new(browser),
        executor: JsExecutor::new(page, Duration::from_secs(settings.timeout.max(1))),
        events,
    })
}
