//! LLM 服务 - 业务能力层
//!
//! 只负责"调用模型"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - OpenAI / Anthropic / Google 都走兼容 OpenAI 协议的端点

use std::sync::LazyLock;

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::infrastructure::credentials::ApiKeys;
use crate::models::catalog::{find_model, ModelSpec};

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("code fence regex"));

/// 文本补全能力
#[async_trait]
pub trait CompletionModel: Send + Sync + 'static {
    /// 发送一条用户消息（可带系统消息），返回模型回复的文本
    async fn complete(&self, user_message: &str, system_message: Option<&str>) -> Result<String>;
}

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API
/// - 只处理单条消息
/// - 不关心流程顺序
#[derive(Clone)]
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
}

impl LlmService {
    /// 按模型目录创建服务；模型未知或缺少对应密钥时返回配置错误
    pub fn for_model(model: &str, temperature: f32, keys: &ApiKeys) -> Result<Self, ConfigError> {
        let spec = find_model(model).ok_or_else(|| ConfigError::UnknownModel {
            model: model.to_string(),
        })?;
        let api_key = keys
            .key_for(spec.provider)
            .ok_or_else(|| ConfigError::MissingApiKey {
                model: model.to_string(),
                provider: spec.provider.name().to_string(),
            })?;
        Ok(Self::new(spec, api_key, temperature))
    }

    pub fn new(spec: &ModelSpec, api_key: &str, temperature: f32) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(spec.provider.api_base());

        Self {
            client: Client::with_config(openai_config),
            model_name: spec.name.to_string(),
            temperature,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 通用的 LLM 调用函数
    pub async fn send_to_llm(&self, user_message: &str, system_message: Option<&str>) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(2048u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl CompletionModel for LlmService {
    async fn complete(&self, user_message: &str, system_message: Option<&str>) -> Result<String> {
        self.send_to_llm(user_message, system_message).await
    }
}

/// 从模型回复中提取 JSON
///
/// 依次尝试：整段文本、```json 代码块、第一个 `{...}` 或 `[...]` 片段
pub fn parse_structured_answer(text: &str) -> Result<JsonValue> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
        return Ok(value);
    }

    if let Some(cap) = CODE_FENCE.captures(trimmed) {
        if let Ok(value) = serde_json::from_str::<JsonValue>(cap[1].trim()) {
            return Ok(value);
        }
    }

    // 先出现的括号决定外层结构，列表里的对象不能抢先
    let mut spans = [('{', '}'), ('[', ']')];
    spans.sort_by_key(|(open, _)| trimmed.find(*open).unwrap_or(usize::MAX));
    for (open, close) in spans {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<JsonValue>(&trimmed[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    anyhow::bail!(
        "无法从回复中解析 JSON: {}",
        crate::utils::logging::truncate_text(trimmed, 120)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_json() {
        assert_eq!(parse_structured_answer(r#" {"a": 1} "#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "Here you go:\n```json\n[{\"name\": \"Acme\"}]\n```\nDone.";
        assert_eq!(parse_structured_answer(text).unwrap(), json!([{"name": "Acme"}]));
    }

    #[test]
    fn test_parse_embedded_object() {
        let text = "Result: {\"city\": \"Lima\"} (verified)";
        assert_eq!(parse_structured_answer(text).unwrap(), json!({"city": "Lima"}));
    }

    #[test]
    fn test_parse_embedded_list_with_one_object() {
        let text = "I found these companies: [{\"name\": \"Acme\", \"website\": \"acme.com\"}]";
        assert_eq!(
            parse_structured_answer(text).unwrap(),
            json!([{"name": "Acme", "website": "acme.com"}])
        );
    }

    #[test]
    fn test_parse_failure() {
        assert!(parse_structured_answer("no json here").is_err());
    }

    #[test]
    fn test_for_model_requires_provider_key() {
        let keys = ApiKeys {
            openai: Some("sk-test".into()),
            ..Default::default()
        };
        assert!(LlmService::for_model("gpt-4o-mini", 0.0, &keys).is_ok());
        assert_eq!(
            LlmService::for_model("claude-3-sonnet", 0.0, &keys).err(),
            Some(ConfigError::MissingApiKey {
                model: "claude-3-sonnet".into(),
                provider: "anthropic".into(),
            })
        );
        assert_eq!(
            LlmService::for_model("gpt-9", 0.0, &keys).err(),
            Some(ConfigError::UnknownModel { model: "gpt-9".into() })
        );
    }

    /// 测试真实 LLM 调用
    #[tokio::test]
    #[ignore]
    async fn test_send_to_llm_simple() {
        let _ = tracing_subscriber::fmt::try_init();

        let keys = ApiKeys::default().with_env_overrides();
        let service = LlmService::for_model("gpt-4o-mini", 0.0, &keys).expect("需要 OPENAI_API_KEY");
        let response = service
            .send_to_llm("Reply with the JSON {\"ok\": true}", None)
            .await
            .unwrap();
        assert_eq!(parse_structured_answer(&response).unwrap(), json!({"ok": true}));
    }
}
