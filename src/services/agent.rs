//! 浏览器 agent - 业务能力层
//!
//! 给定一段任务描述和一个浏览器句柄，自主浏览并返回结构化结果。
//! 由模型逐步决定动作，每一步只看到当前页面的 URL、标题和截断后的正文。

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::browser::BrowserHandle;
use crate::infrastructure::PageSnapshot;
use crate::orchestrator::resource_pool::PoolResource;
use crate::services::llm_service::{parse_structured_answer, CompletionModel};
use crate::utils::logging::truncate_text;

/// 默认的最大步数
pub const DEFAULT_MAX_STEPS: usize = 12;

/// 每一步发给模型的页面正文上限（字符）
pub const DEFAULT_PAGE_TEXT_LIMIT: usize = 6000;

const AGENT_SYSTEM_PROMPT: &str = r#"You are a web browsing agent. You control a single browser tab.
On every turn you receive the task, the actions taken so far and the current page.
Answer with exactly one JSON object and nothing else:
  {"action": "goto", "url": "<absolute url>"}   open a page
  {"action": "back"}                               go back one page
  {"action": "done", "result": <json>}            finish with the final answer
The final answer must follow the format requested by the task."#;

/// 浏览器 agent 能力
#[async_trait]
pub trait BrowserAgent: Send + Sync + 'static {
    type Handle: PoolResource;

    /// 在给定句柄上执行一次完整任务
    async fn run(&self, task: &str, handle: &Self::Handle) -> Result<JsonValue>;
}

/// 模型返回的单步动作
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AgentAction {
    Goto { url: String },
    Back,
    Done { result: JsonValue },
}

/// 基于 LLM 的浏览器 agent
pub struct LlmBrowserAgent<M: CompletionModel> {
    model: M,
    max_steps: usize,
    page_text_limit: usize,
}

impl<M: CompletionModel> LlmBrowserAgent<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            max_steps: DEFAULT_MAX_STEPS,
            page_text_limit: DEFAULT_PAGE_TEXT_LIMIT,
        }
    }
}

#[async_trait]
impl<M: CompletionModel> BrowserAgent for LlmBrowserAgent<M> {
    type Handle = BrowserHandle;

    async fn run(&self, task: &str, handle: &BrowserHandle) -> Result<JsonValue> {
        let executor = handle.executor();
        let mut history: Vec<String> = Vec::new();

        for step in 1..=self.max_steps {
            let snapshot = executor.snapshot().await.unwrap_or_default();
            let prompt = build_step_prompt(task, &history, &snapshot, self.page_text_limit);
            let reply = self
                .model
                .complete(&prompt, Some(AGENT_SYSTEM_PROMPT))
                .await
                .with_context(|| format!("第 {} 步调用模型失败", step))?;

            let action = match parse_action(&reply) {
                Ok(action) => action,
                Err(e) => {
                    warn!("[浏览器 {}] 第 {} 步动作无法解析: {}", handle.slot(), step, e);
                    history.push("(invalid action, answer with one JSON object)".to_string());
                    continue;
                }
            };
            debug!("[浏览器 {}] 第 {} 步: {:?}", handle.slot(), step, action);

            match action {
                AgentAction::Done { result } => return Ok(unwrap_result(result)),
                AgentAction::Goto { url } => match executor.goto(&url).await {
                    Ok(()) => history.push(format!("goto {}", url)),
                    Err(e) => history.push(format!("goto {} failed: {}", url, e)),
                },
                AgentAction::Back => {
                    let outcome = executor.eval("history.back()").await;
                    history.push(record_back(outcome.map(|_| ())));
                    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                }
            }
        }

        anyhow::bail!("{} 步内未完成任务", self.max_steps)
    }
}

/// 组装单步提示词
pub fn build_step_prompt(task: &str, history: &[String], page: &PageSnapshot, text_limit: usize) -> String {
    let history_text = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("{}. {}", i + 1, entry))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "TASK:\n{}\n\nACTIONS SO FAR:\n{}\n\nCURRENT PAGE:\nURL: {}\nTITLE: {}\nTEXT:\n{}",
        task,
        history_text,
        if page.url.is_empty() { "about:blank" } else { page.url.as_str() },
        page.title,
        truncate_text(&page.text, text_limit)
    )
}

/// 解析模型返回的动作
pub fn parse_action(reply: &str) -> Result<AgentAction> {
    let value = parse_structured_answer(reply)?;
    serde_json::from_value(value).context("不是合法的动作")
}

/// 后退动作写入历史的文本，失败时让模型看到原因
fn record_back(outcome: Result<()>) -> String {
    match outcome {
        Ok(()) => "back".to_string(),
        Err(e) => format!("back failed: {}", e),
    }
}

/// `result` 可能是包在字符串里的 JSON
fn unwrap_result(result: JsonValue) -> JsonValue {
    if let JsonValue::String(text) = &result {
        if let Ok(parsed) = parse_structured_answer(text) {
            return parsed;
        }
    }
    result
}
