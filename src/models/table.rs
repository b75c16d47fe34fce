//! 内存中的表格（一次运行的输入或输出）

use serde_json::{Map, Value as JsonValue};

use crate::models::work_item::{ItemRecord, WorkItem};

/// 带表头的表格，每行是列名到值的映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, JsonValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// 返回 `required` 中表格缺少的列（保持给定顺序）
    pub fn missing_columns(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .cloned()
            .collect()
    }

    /// 每行转换为一个带原始序号的工作项
    pub fn to_work_items(&self) -> Vec<WorkItem> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| WorkItem::new(index, row.clone()))
            .collect()
    }

    /// 由结果记录构造输出表，只保留 `columns` 中的列，缺失值写空
    pub fn from_records(columns: Vec<String>, records: Vec<ItemRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| {
                        let value = record.fields.get(c).cloned().unwrap_or(JsonValue::Null);
                        (c.clone(), value)
                    })
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_columns() {
        let table = Table::new(vec!["name".into(), "city".into()]);
        let missing = table.missing_columns(&["website".into(), "name".into(), "url".into()]);
        assert_eq!(missing, vec!["website", "url"]);
    }

    #[test]
    fn test_from_records_orders_columns() {
        let mut fields = Map::new();
        fields.insert("b".into(), json!(2));
        fields.insert("a".into(), json!(1));
        fields.insert("extra".into(), json!("x"));
        let table = Table::from_records(
            vec!["a".into(), "b".into(), "c".into()],
            vec![ItemRecord { index: 0, fields }],
        );
        let row: Vec<&String> = table.rows[0].keys().collect();
        assert_eq!(row, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0]["c"], JsonValue::Null);
    }
}
