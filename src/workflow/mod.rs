//! 流程层
//!
//! 定义"一个工作项"的处理流程，不持有资源

pub mod item_ctx;
pub mod item_flow;

pub use item_ctx::ItemCtx;
pub use item_flow::{interpret, ItemFlow};
