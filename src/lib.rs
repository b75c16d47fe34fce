//! # Company Scout
//!
//! 用浏览器 agent 并发搜索公司、按 profile 增强表格数据的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统沿用严格的分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page）或具体文件格式，只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 goto() / eval() / snapshot()
//! - `spreadsheet` / `credentials` / `localization` - 表格、密钥文件、界面文本
//! - `browser/` - 启动 chromium，`BrowserHandle` 作为资源池中的句柄
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个工作项
//! - `BrowserAgent` - 给定任务和句柄，返回结构化结果
//! - `LlmService` - 模型调用能力
//! - `PromptTemplate` - `{字段}` 替换
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个工作项"的完整处理流程
//! - `ItemCtx` - 上下文封装（index + slot + label）
//! - `ItemFlow` - 流程编排（render → agent → interpret → merge）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/resource_pool` / `limiter` / `scheduler` - 资源与并发
//! - `orchestrator/dispatcher` / `collector` - 派发与收集
//! - `orchestrator/company_search` / `enrichment` - 两个运行驱动
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{BrowserHandle, BrowserLauncher};
pub use config::{Config, Paths};
pub use error::{AppError, AppResult, ConfigError};
pub use infrastructure::{ApiKeys, JsExecutor, Localization};
pub use models::{Profile, ResultSet, Table, TaskOutcome, WorkItem};
pub use orchestrator::{run_company_search, run_enrichment, EnrichmentRequest};
pub use services::{BrowserAgent, CompletionModel, LlmBrowserAgent, LlmService};
pub use workflow::{ItemCtx, ItemFlow};
