//! 提示词模板 - 业务能力层
//!
//! `{字段名}` 按工作项的字段做纯文本替换。工作项中没有的字段保持原样，
//! 上游数据可能是稀疏的，这不算错误。

use std::sync::LazyLock;

use regex::Regex;

use crate::models::work_item::{value_to_text, WorkItem};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_ \-]*)\}").expect("placeholder regex"));

/// 提示词模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 用工作项的每个字段替换对应的占位符
    pub fn render(&self, item: &WorkItem) -> String {
        item.fields().iter().fold(self.text.clone(), |text, (field, value)| {
            text.replace(&format!("{{{}}}", field), &value_to_text(value))
        })
    }

    /// 模板中出现的所有占位符名（去重，按出现顺序）
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for cap in PLACEHOLDER.captures_iter(&self.text) {
            let name = cap[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// 工作项中没有对应字段的占位符
    pub fn unmatched(&self, item: &WorkItem) -> Vec<String> {
        self.placeholders()
            .into_iter()
            .filter(|name| item.get(name).is_none())
            .collect()
    }
}
