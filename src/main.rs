//! 公司搜索工具：读取 config.toml，执行所有搜索查询，写出 companies_data.xlsx

use anyhow::Result;
use tracing::{info, warn};

use company_scout::browser::BrowserLauncher;
use company_scout::config::{Config, Paths};
use company_scout::infrastructure::{write_table, ApiKeys};
use company_scout::models::{find_model, Table};
use company_scout::orchestrator::{company_columns, run_company_search};
use company_scout::services::{LlmBrowserAgent, LlmService};
use company_scout::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let paths = Paths::from_env();
    let config = Config::load(&paths.config)?;
    config.validate()?;
    let keys = ApiKeys::load(&paths.keys).with_env_overrides();

    let search = &config.search;
    logging::log_startup("公司搜索", search.max_parallel);

    let temperature = find_model(&search.model)
        .map(|spec| spec.default_temperature)
        .unwrap_or_default();
    let llm = LlmService::for_model(&search.model, temperature, &keys)?;
    let agent = LlmBrowserAgent::new(llm);
    let launcher = BrowserLauncher::new(search.browser_settings());

    let results = run_company_search(search, &config.search_queries, &launcher, agent).await?;

    if results.is_empty() {
        warn!("⚠️ 没有可保存的结果，只写入表头");
    }
    let table = Table::from_records(company_columns(), results.into_records());
    write_table(&search.output_file, &table)?;
    info!("✓ 结果已保存至: {} ({} 条)", search.output_file.display(), table.len());

    Ok(())
}
