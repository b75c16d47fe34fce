//! 工作项处理上下文
//!
//! 封装"我正在处理第几项、在哪个槽位上"这一信息

use std::fmt::Display;

use crate::models::work_item::WorkItem;

/// 工作项处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 工作项在提交列表中的位置
    pub index: usize,

    /// 执行槽位（离线模式没有槽位）
    pub slot: Option<usize>,

    /// 日志标识（website / url / name / key）
    pub label: String,
}

impl ItemCtx {
    pub fn new(item: &WorkItem, slot: Option<usize>) -> Self {
        Self {
            index: item.index(),
            slot,
            label: item.label(),
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot {
            Some(slot) => write!(f, "[#{} 浏览器{} {}]", self.index, slot, self.label),
            None => write!(f, "[#{} {}]", self.index, self.label),
        }
    }
}
