//! 基础设施层（Infrastructure Layer）
//!
//! 持有稀缺资源或具体文件格式，只暴露能力

pub mod credentials;
pub mod js_executor;
pub mod localization;
pub mod spreadsheet;

pub use credentials::ApiKeys;
pub use js_executor::{JsExecutor, PageSnapshot};
pub use localization::Localization;
pub use spreadsheet::{read_table, write_table};
