//! 程序配置文件（config.toml）
//!
//! 启动时加载一次，之后只读；只有显式调用 `save` 才会写回磁盘。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppResult, ConfigError, FileError};
use crate::models::profile::{BrowserSettings, Profile};

/// 默认配置文件名
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// 默认密钥文件名
pub const DEFAULT_KEYS_PATH: &str = "keys.enc";
/// 默认本地化文件名
pub const DEFAULT_LOCALIZATION_PATH: &str = "localization.json";

/// 公司搜索工具的设置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// 并行浏览器数量
    pub max_parallel: usize,
    /// 是否无头运行
    pub headless: bool,
    /// 页面操作超时（秒）
    pub timeout: u64,
    /// agent 使用的模型
    pub model: String,
    /// 结果输出文件
    pub output_file: PathBuf,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_parallel: 3,
            headless: true,
            timeout: 30,
            model: "gpt-4o-mini".to_string(),
            output_file: PathBuf::from("companies_data.xlsx"),
        }
    }
}

impl SearchSettings {
    /// 浏览器池设置
    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            max_parallel: self.max_parallel,
            headless: self.headless,
            timeout: self.timeout,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 输入表格（xlsx / csv）
    pub input_file: PathBuf,
    /// 输出表格
    pub output_file: PathBuf,
    /// 当前使用的 profile
    pub profile_name: String,
    /// 离线模式同时发出的模型请求数
    pub offline_concurrency: usize,
    /// 公司搜索查询列表
    pub search_queries: Vec<String>,
    /// 公司搜索设置
    pub search: SearchSettings,
    /// profile 名称 → profile
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("input.xlsx"),
            output_file: PathBuf::from("output.xlsx"),
            profile_name: "default".to_string(),
            offline_concurrency: 4,
            search_queries: Vec::new(),
            search: SearchSettings::default(),
            profiles: BTreeMap::new(),
        }
    }
}

/// 运行时使用的文件路径（可被环境变量覆盖）
#[derive(Clone, Debug)]
pub struct Paths {
    pub config: PathBuf,
    pub keys: PathBuf,
    pub localization: PathBuf,
}

impl Paths {
    pub fn from_env() -> Self {
        Self {
            config: std::env::var("CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
            keys: std::env::var("KEYS_PATH").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_KEYS_PATH)),
            localization: std::env::var("LOCALIZATION_PATH").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_LOCALIZATION_PATH)),
        }
    }
}

impl Config {
    /// 从 TOML 文件加载配置
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| FileError::read(path.display().to_string(), e))?;
        let config = Self::from_toml(&content).map_err(|source| FileError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        info!("✓ 已加载配置: {} (profile 数量: {})", path.display(), config.profiles.len());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 保存配置（用户显式触发）
    pub fn save(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| FileError::write(path.display().to_string(), e))?;
        fs::write(path, content).map_err(|e| FileError::write(path.display().to_string(), e))?;
        info!("✓ 配置已保存: {}", path.display());
        Ok(())
    }

    /// 当前激活的 profile
    pub fn active_profile(&self) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(&self.profile_name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: self.profile_name.clone(),
            })
    }

    /// 新增或覆盖 profile，返回被覆盖的旧值
    pub fn upsert_profile(&mut self, profile: Profile) -> Option<Profile> {
        self.profiles.insert(profile.name.clone(), profile)
    }

    /// 检查数值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.max_parallel == 0 {
            return Err(ConfigError::InvalidPoolSize { size: 0 });
        }
        if self.offline_concurrency == 0 {
            return Err(ConfigError::InvalidPoolSize { size: 0 });
        }
        self.profiles.values().try_for_each(Profile::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
input_file = "companies.csv"
output_file = "out/enriched.xlsx"
profile_name = "offices"
search_queries = ["fintech companies in Chile"]

[search]
max_parallel = 2

[profiles.offices]
name = "offices"
description = "Office lookup"
input_columns = ["website"]
prompt = "Visit {website} and list office cities"
output_columns = ["cities"]
temperature = 0.2

[profiles.offices.browser_config]
max_parallel = 2
headless = false
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.search.max_parallel, 2);
        assert_eq!(config.search.model, "gpt-4o-mini");
        assert_eq!(config.offline_concurrency, 4);

        let profile = config.active_profile().unwrap();
        assert_eq!(profile.input_columns, vec!["website"]);
        let browser = profile.browser_config.as_ref().unwrap();
        assert_eq!(browser.max_parallel, 2);
        assert!(!browser.headless);
        assert_eq!(browser.timeout, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_active_profile() {
        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.profile_name = "missing".into();
        assert_eq!(
            config.active_profile(),
            Err(ConfigError::UnknownProfile {
                name: "missing".into()
            })
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::from_toml(SAMPLE).unwrap();
        let mut extra = config.active_profile().unwrap().clone();
        extra.name = "offline".into();
        extra.use_browser = false;
        extra.browser_config = None;
        assert!(config.upsert_profile(extra).is_none());

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
