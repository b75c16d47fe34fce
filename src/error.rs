use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（必须在派发任何任务之前暴露给操作者）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 资源池错误
    #[error("资源池错误: {0}")]
    Pool(#[from] PoolError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// 输入表缺少必需的列
    #[error("缺少必需的列: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },
    /// 配置中找不到指定的 profile
    #[error("找不到 profile: {name}")]
    UnknownProfile { name: String },
    /// 模型目录中没有该模型
    #[error("未知模型: {model}")]
    UnknownModel { model: String },
    /// 所选模型对应的 API 密钥缺失
    #[error("模型 {model} 需要 {provider} API 密钥")]
    MissingApiKey { model: String, provider: String },
    /// 提示词为空
    #[error("profile {profile} 的提示词为空")]
    EmptyPrompt { profile: String },
    /// 输出列为空
    #[error("profile {profile} 没有声明输出列")]
    NoOutputColumns { profile: String },
    /// 在线模式缺少浏览器配置
    #[error("profile {profile} 启用了浏览器但缺少 browser_config")]
    MissingBrowserConfig { profile: String },
    /// 温度超出 [0, 1]
    #[error("temperature {value} 超出范围 [0, 1]")]
    InvalidTemperature { value: f32 },
    /// 资源池大小必须 >= 1
    #[error("资源池大小必须 >= 1 (实际: {size})")]
    InvalidPoolSize { size: usize },
    /// 并发许可数大于资源池大小，两个任务可能落到同一个槽位
    #[error("并发许可数 {permits} 大于资源池大小 {pool_size}")]
    LimiterExceedsPool { permits: usize, pool_size: usize },
    /// 输入文件不存在
    #[error("输入文件不存在: {path}")]
    InputFileNotFound { path: String },
}

impl ConfigError {
    /// 对应的本地化字符串 key
    pub fn message_key(&self) -> &'static str {
        match self {
            ConfigError::MissingColumns { .. } => "missing_columns",
            ConfigError::UnknownProfile { .. } => "unknown_profile",
            ConfigError::UnknownModel { .. } => "invalid_model",
            ConfigError::MissingApiKey { provider, .. } => match provider.as_str() {
                "openai" => "no_openai_key",
                "anthropic" => "no_anthropic_key",
                _ => "no_google_key",
            },
            ConfigError::EmptyPrompt { .. } => "no_prompt",
            ConfigError::NoOutputColumns { .. } => "no_columns",
            ConfigError::MissingBrowserConfig { .. } => "no_browser_config",
            ConfigError::InvalidTemperature { .. } => "invalid_temperature",
            ConfigError::InvalidPoolSize { .. } | ConfigError::LimiterExceedsPool { .. } => {
                "invalid_parallelism"
            }
            ConfigError::InputFileNotFound { .. } => "input_file_not_found",
        }
    }
}

/// 资源池错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// 槽位超出范围
    #[error("槽位 {slot} 超出范围 [0, {size})")]
    SlotOutOfRange { slot: usize, size: usize },
    /// 资源池已释放
    #[error("资源池已释放")]
    Released,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 表格格式不正确
    #[error("表格格式错误 ({path}): {reason}")]
    BadTable { path: String, reason: String },
}

/// 单个工作项被丢弃的原因
///
/// 只在派发器/收集器内部流转，不会向上传播
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// agent 调用出错（网络、超时、步数耗尽等）
    #[error("agent 执行失败: {0}")]
    Failed(String),
    /// agent 明确报告访问被拦截
    #[error("访问被拦截: {0}")]
    Blocked(String),
    /// agent 返回的内容无法解析为对象
    #[error("返回内容格式错误: {0}")]
    Malformed(String),
    /// 执行任务的 worker 意外退出
    #[error("任务异常退出: {0}")]
    Aborted(String),
}

// ========== 便捷构造函数 ==========

impl FileError {
    /// 创建文件读取错误
    pub fn read(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// 创建文件写入错误
    pub fn write(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_every_column() {
        let err = ConfigError::MissingColumns {
            missing: vec!["website".into(), "name".into()],
        };
        assert_eq!(err.to_string(), "缺少必需的列: website, name");
        assert_eq!(err.message_key(), "missing_columns");
    }

    #[test]
    fn test_missing_key_maps_to_provider_message() {
        let err = ConfigError::MissingApiKey {
            model: "claude-3-sonnet".into(),
            provider: "anthropic".into(),
        };
        assert_eq!(err.message_key(), "no_anthropic_key");
    }

    #[test]
    fn test_config_error_converts_into_app_error() {
        let err: AppError = ConfigError::InvalidPoolSize { size: 0 }.into();
        assert!(matches!(err, AppError::Config(ConfigError::InvalidPoolSize { size: 0 })));
    }
}
