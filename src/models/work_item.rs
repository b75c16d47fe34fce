//! 工作项与任务结果
//!
//! 一个 `WorkItem` 驱动一次 agent 任务，产生恰好一个 `TaskOutcome`。

use serde_json::{Map, Value as JsonValue};

use crate::error::ItemError;

/// 用于日志标识工作项的字段，按优先级排列
const LABEL_FIELDS: [&str; 4] = ["website", "url", "name", "key"];

/// 工作项（一家公司或表格中的一行）
///
/// 派发后不可变；`index` 是它在提交列表中的位置，决定槽位并用于恢复输入顺序。
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    index: usize,
    fields: Map<String, JsonValue>,
}

impl WorkItem {
    pub fn new(index: usize, fields: Map<String, JsonValue>) -> Self {
        Self { index, fields }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    /// 日志里用来标识工作项的文本（website / url / name / key，都没有则用序号）
    pub fn label(&self) -> String {
        LABEL_FIELDS
            .iter()
            .filter_map(|field| self.fields.get(*field))
            .map(value_to_text)
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| format!("#{}", self.index))
    }
}

/// 成功的任务结果：原始字段 + agent 产出的字段
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub index: usize,
    pub fields: Map<String, JsonValue>,
}

/// 单个工作项的终态
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// 成功，带合并后的字段
    Succeeded(ItemRecord),
    /// 被丢弃，不产生结果
    Dropped { index: usize, reason: ItemError },
}

/// 一次运行中所有未被丢弃的结果，按完成顺序排列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    records: Vec<ItemRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ItemRecord) {
        self.records.push(record);
    }

    /// 拼接另一组结果（不去重、不交错）
    pub fn extend(&mut self, other: ResultSet) {
        self.records.extend(other.records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ItemRecord] {
        &self.records
    }

    /// 按原始序号重新排序，恢复输入顺序
    pub fn into_input_order(mut self) -> Vec<ItemRecord> {
        self.records.sort_by_key(|record| record.index);
        self.records
    }

    pub fn into_records(self) -> Vec<ItemRecord> {
        self.records
    }
}

/// 把 JSON 值转成写入提示词/表格的文本（字符串不带引号，null 为空）
pub fn value_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
