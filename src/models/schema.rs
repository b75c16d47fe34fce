//! 输出字段 schema 与结果合并
//!
//! agent 的结构化响应先按 schema 校验，再合并到工作项的原始字段上。
//! 原始字段永远不会被移除；缺失字段用默认值补齐，未声明的字段被丢弃，两者都只记 warn。

use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::models::work_item::{value_to_text, ItemRecord, WorkItem};

/// 字段类型
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// 文本，可限制最大字符数
    Text { max_chars: Option<usize> },
    /// 布尔值，接受 "yes"/"true"/1 等写法
    Bool,
    /// 列表，写出时以 ", " 连接
    List,
    /// 任意值，写出时转成文本
    Any,
}

/// 单个输出字段
#[derive(Debug, Clone, PartialEq)]
pub struct OutputField {
    pub name: String,
    pub kind: FieldKind,
    pub default: JsonValue,
}

impl OutputField {
    pub fn new(name: impl Into<String>, kind: FieldKind, default: JsonValue) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
        }
    }
}

/// 有序的输出字段集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSchema {
    fields: Vec<OutputField>,
}

impl OutputSchema {
    pub fn new(fields: Vec<OutputField>) -> Self {
        Self { fields }
    }

    /// 由 profile 的输出列构造（全部为 Any，默认空字符串）
    pub fn from_columns(columns: &[String]) -> Self {
        Self::new(
            columns
                .iter()
                .map(|c| OutputField::new(c.clone(), FieldKind::Any, JsonValue::String(String::new())))
                .collect(),
        )
    }

    pub fn fields(&self) -> &[OutputField] {
        &self.fields
    }

    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// 把 agent 的响应对象合并到工作项上
    pub fn merge(&self, item: &WorkItem, response: &Map<String, JsonValue>) -> ItemRecord {
        let label = item.label();
        let mut merged = item.fields().clone();

        for field in &self.fields {
            let value = match response.get(&field.name) {
                Some(raw) if !raw.is_null() => normalize(&field.kind, raw),
                // 输入里已有同名列，保留原值
                _ if item.get(&field.name).is_some() => {
                    warn!("[{}] ⚠️ 响应缺少字段 {}，保留原值", label, field.name);
                    continue;
                }
                _ => {
                    warn!("[{}] ⚠️ 响应缺少字段 {}，使用默认值", label, field.name);
                    field.default.clone()
                }
            };
            merged.insert(field.name.clone(), value);
        }

        let unexpected: Vec<&str> = response
            .keys()
            .filter(|key| !self.fields.iter().any(|f| &f.name == *key))
            .map(String::as_str)
            .collect();
        if !unexpected.is_empty() {
            warn!("[{}] ⚠️ 忽略未声明的字段: {}", label, unexpected.join(", "));
        }

        ItemRecord {
            index: item.index(),
            fields: merged,
        }
    }
}

fn normalize(kind: &FieldKind, raw: &JsonValue) -> JsonValue {
    match kind {
        FieldKind::Text { max_chars } => {
            let text = value_to_text(raw);
            match max_chars {
                Some(max) if text.chars().count() > *max => {
                    JsonValue::String(text.chars().take(*max).collect())
                }
                _ => JsonValue::String(text),
            }
        }
        FieldKind::Bool => JsonValue::Bool(coerce_bool(raw)),
        FieldKind::List => {
            let joined = match raw {
                JsonValue::Array(items) => items
                    .iter()
                    .map(value_to_text)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", "),
                other => value_to_text(other),
            };
            JsonValue::String(joined)
        }
        FieldKind::Any => match raw {
            JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => raw.clone(),
            other => JsonValue::String(value_to_text(other)),
        },
    }
}

fn coerce_bool(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        JsonValue::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "1" | "да"
        ),
        _ => false,
    }
}
