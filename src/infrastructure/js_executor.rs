//! JS 执行器 - 基础设施层
//!
//! 持有一个 page 资源，只暴露"导航 / 执行 JS / 读取页面"的能力

use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// 读取页面可见内容的脚本
const SNAPSHOT_JS: &str = r#"
(() => ({
    url: location.href,
    title: document.title || "",
    text: document.body ? document.body.innerText : ""
}))()
"#;

/// 页面快照
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub text: String,
}

/// JS 执行器
///
/// 职责：
/// - 持有一个 Page 资源
/// - 暴露 goto() / eval() / snapshot() 能力
/// - 不认识 WorkItem / Profile
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
    timeout: Duration,
}

impl JsExecutor {
    /// 创建新的 JS 执行器，`timeout` 用于每一次页面操作
    pub fn new(page: Page, timeout: Duration) -> Self {
        Self { page, timeout }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 导航到指定 URL 并等待加载完成
    pub async fn goto(&self, url: &str) -> Result<()> {
        tokio::time::timeout(self.timeout, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
        .with_context(|| format!("导航超时 ({}s): {}", self.timeout.as_secs(), url))?
        .with_context(|| format!("导航失败: {}", url))?;
        Ok(())
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = tokio::time::timeout(self.timeout, self.page.evaluate(js_code.into()))
            .await
            .context("脚本执行超时")??;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 读取当前页面的 URL、标题和可见文本
    pub async fn snapshot(&self) -> Result<PageSnapshot> {
        self.eval_as(SNAPSHOT_JS).await
    }
}
