//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责资源管理和批量调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `resource_pool` - 资源池
//! - 一次性启动固定数量的浏览器句柄
//! - 按槽位取用，运行结束时统一释放
//!
//! ### `limiter` - 并发闸门
//! - 限制同时执行 agent 阶段的任务数（Semaphore）
//!
//! ### `scheduler` - 槽位调度器
//! - 每个槽位一个 worker，独占该槽位的句柄
//! - 任务 panic 不影响同一 worker 的后续任务
//!
//! ### `dispatcher` / `collector` - 派发与收集
//! - 按 `index % N` 派发工作项
//! - 等待全部结束，汇总成功结果
//!
//! ### `company_search` / `enrichment` - 两个驱动
//! - 公司搜索：发现 → 分析
//! - 表格增强：按 profile 在线或离线处理每一行
//!
//! ## 层次关系
//!
//! ```text
//! company_search / enrichment (处理一次运行)
//!     ↓
//! dispatcher + scheduler + collector (处理 Vec<WorkItem>)
//!     ↓
//! workflow::ItemFlow (处理单个 WorkItem)
//!     ↓
//! services (能力层：agent / llm / prompt)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有浏览器句柄
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计，不解释 agent 的响应

pub mod collector;
pub mod company_search;
pub mod dispatcher;
pub mod enrichment;
pub mod limiter;
pub mod resource_pool;
pub mod scheduler;

// 重新导出主要类型
pub use collector::{collect, collect_outcomes, BatchStats};
pub use company_search::{company_columns, company_schema, run_company_search, CompanySearcher};
pub use dispatcher::{dispatch, slot_for, PendingBatch};
pub use enrichment::{output_columns, run_enrichment, validate_request, EnrichmentRequest};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use resource_pool::{HandleLauncher, PoolResource, ResourcePool};
pub use scheduler::SlotScheduler;
