//! Profile：提示词 + 输出 schema + 模型 + 并发设置

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::schema::OutputSchema;

/// 浏览器池设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// 并行浏览器数量（同时也是并发许可数）
    pub max_parallel: usize,
    /// 是否无头运行
    pub headless: bool,
    /// 单次页面操作超时（秒）
    pub timeout: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            max_parallel: 3,
            headless: true,
            timeout: 30,
        }
    }
}

/// 可持久化的处理配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 输入表必须包含的列
    #[serde(default)]
    pub input_columns: Vec<String>,
    /// 提示词模板，`{列名}` 会被替换为该行的值
    pub prompt: String,
    /// 模型需要产出的列
    #[serde(default)]
    pub output_columns: Vec<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_use_browser")]
    pub use_browser: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_config: Option<BrowserSettings>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_use_browser() -> bool {
    true
}

impl Profile {
    pub fn output_schema(&self) -> OutputSchema {
        OutputSchema::from_columns(&self.output_columns)
    }

    /// 检查数值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature {
                value: self.temperature,
            });
        }
        if let Some(browser) = &self.browser_config {
            if browser.max_parallel == 0 {
                return Err(ConfigError::InvalidPoolSize { size: 0 });
            }
        }
        Ok(())
    }
}
