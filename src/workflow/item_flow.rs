//! 工作项处理流程 - 流程层
//!
//! 核心职责：定义"一个工作项"的完整处理流程
//!
//! 流程顺序：
//! 1. 用工作项字段渲染提示词
//! 2. 调用 agent
//! 3. 解释响应 → schema 合并 / 丢弃
//!
//! 不重试；任何失败都只影响当前工作项。

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::error::ItemError;
use crate::models::schema::OutputSchema;
use crate::models::work_item::{TaskOutcome, WorkItem};
use crate::services::agent::BrowserAgent;
use crate::services::llm_service::parse_structured_answer;
use crate::services::prompt::PromptTemplate;
use crate::utils::logging::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

/// 工作项处理流程
///
/// - 不持有任何句柄，句柄由调度层传入
/// - 只依赖业务能力（services）
pub struct ItemFlow<A: BrowserAgent> {
    agent: Arc<A>,
    template: PromptTemplate,
    schema: OutputSchema,
}

impl<A: BrowserAgent> ItemFlow<A> {
    pub fn new(agent: Arc<A>, template: PromptTemplate, schema: OutputSchema) -> Self {
        Self {
            agent,
            template,
            schema,
        }
    }

    pub async fn run(&self, item: &WorkItem, handle: &A::Handle, ctx: &ItemCtx) -> TaskOutcome {
        let unmatched = self.template.unmatched(item);
        if !unmatched.is_empty() {
            debug!("{} 提示词中未替换的占位符: {}", ctx, unmatched.join(", "));
        }
        let task = self.template.render(item);

        info!("{} 🔍 开始处理", ctx);
        let response = self.agent.run(&task, handle).await;
        interpret(&self.schema, item, ctx, response)
    }
}

/// 把 agent（或模型）的原始响应解释为任务结果
pub fn interpret(
    schema: &OutputSchema,
    item: &WorkItem,
    ctx: &ItemCtx,
    response: anyhow::Result<JsonValue>,
) -> TaskOutcome {
    let dropped = |reason: ItemError| TaskOutcome::Dropped {
        index: item.index(),
        reason,
    };

    let value = match response {
        Ok(JsonValue::String(text)) => match parse_structured_answer(&text) {
            Ok(value) => value,
            Err(_) => {
                error!("{} ❌ 响应不是 JSON: {}", ctx, truncate_text(&text, 80));
                return dropped(ItemError::Malformed(truncate_text(&text, 200)));
            }
        },
        Ok(value) => value,
        Err(e) => {
            error!("{} ❌ 处理失败: {:#}", ctx, e);
            return dropped(ItemError::Failed(format!("{:#}", e)));
        }
    };

    let object = match value {
        JsonValue::Object(object) => object,
        other => {
            error!("{} ❌ 响应不是 JSON 对象", ctx);
            return dropped(ItemError::Malformed(truncate_text(&other.to_string(), 200)));
        }
    };

    if let Some(reason) = object.get("error") {
        let reason = crate::models::work_item::value_to_text(reason);
        warn!("{} 🚫 访问被拦截: {}", ctx, reason);
        return dropped(ItemError::Blocked(reason));
    }

    info!("{} ✅ 处理完成", ctx);
    TaskOutcome::Succeeded(schema.merge(item, &object))
}
