//! 可用模型目录

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// 模型提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
}

impl Provider {
    /// 标准名称（与密钥文件中的字段一致）
    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
        }
    }

    /// 兼容 OpenAI 协议的 API 地址
    pub fn api_base(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }
}

/// 单个模型的静态描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub provider: Provider,
    /// 描述文本的本地化 key
    pub description_key: &'static str,
    pub default_temperature: f32,
}

static AVAILABLE_MODELS: phf::Map<&'static str, ModelSpec> = phf_map! {
    "gpt-4o-mini" => ModelSpec {
        name: "gpt-4o-mini",
        provider: Provider::OpenAi,
        description_key: "model_gpt4o_mini_desc",
        default_temperature: 0.0,
    },
    "gpt-4o" => ModelSpec {
        name: "gpt-4o",
        provider: Provider::OpenAi,
        description_key: "model_gpt4o_desc",
        default_temperature: 0.0,
    },
    "claude-3-sonnet" => ModelSpec {
        name: "claude-3-sonnet",
        provider: Provider::Anthropic,
        description_key: "model_claude3_sonnet_desc",
        default_temperature: 0.0,
    },
    "gemini-1.5-flash" => ModelSpec {
        name: "gemini-1.5-flash",
        provider: Provider::Google,
        description_key: "model_gemini_flash_desc",
        default_temperature: 0.0,
    },
};

/// 按名称查找模型
pub fn find_model(name: &str) -> Option<&'static ModelSpec> {
    AVAILABLE_MODELS.get(name)
}

/// 所有模型名称（按字母序）
pub fn model_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = AVAILABLE_MODELS.keys().copied().collect();
    names.sort_unstable();
    names
}
