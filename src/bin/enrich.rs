//! 表格增强工具：用 config.toml 中当前 profile 处理输入表并写出结果

use anyhow::Result;
use tracing::{error, info, warn};

use company_scout::browser::BrowserLauncher;
use company_scout::config::{Config, Paths};
use company_scout::error::{AppError, AppResult, ConfigError};
use company_scout::infrastructure::{read_table, write_table, ApiKeys, Localization};
use company_scout::orchestrator::{run_enrichment, validate_request, EnrichmentRequest};
use company_scout::services::{LlmBrowserAgent, LlmService};
use company_scout::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let paths = Paths::from_env();
    let mut l10n = Localization::load(&paths.localization);
    if let Ok(lang) = std::env::var("APP_LANGUAGE") {
        l10n.set_language(lang);
    }

    let config = Config::load(&paths.config)?;
    let keys = ApiKeys::load(&paths.keys).with_env_overrides();

    match run(&config, &keys, &l10n).await {
        Ok(()) => Ok(()),
        Err(AppError::Config(e)) => {
            let message = localize(&l10n, &e);
            error!("❌ {}", message);
            Err(anyhow::anyhow!(message))
        }
        Err(e) => {
            let message = l10n.format("processing_error", &[("error", e.to_string().as_str())]);
            error!("❌ {}", message);
            Err(e.into())
        }
    }
}

async fn run(config: &Config, keys: &ApiKeys, l10n: &Localization) -> AppResult<()> {
    config.validate()?;
    let profile = config.active_profile()?;

    if !config.input_file.exists() {
        return Err(ConfigError::InputFileNotFound {
            path: config.input_file.display().to_string(),
        }
        .into());
    }
    let table = read_table(&config.input_file)?;

    let request = EnrichmentRequest {
        profile,
        table: &table,
        api_keys: keys,
    };
    validate_request(&request)?;

    let llm = LlmService::for_model(&profile.model, profile.temperature, keys)?;
    let settings = profile.browser_config.clone().unwrap_or_default();
    let parallel = if profile.use_browser {
        settings.max_parallel
    } else {
        config.offline_concurrency
    };
    logging::log_startup("表格增强", parallel);
    logging::log_batch_start(&profile.name, table.len());
    info!("{}", l10n.get("processing"));

    let launcher = BrowserLauncher::new(settings);
    let agent = LlmBrowserAgent::new(llm.clone());
    let output = run_enrichment(request, config.offline_concurrency, &launcher, agent, llm).await?;

    if output.is_empty() {
        warn!("⚠️ {}", l10n.get("no_results"));
    }
    write_table(&config.output_file, &output)?;

    logging::log_batch_complete(&profile.name, output.len(), table.len());
    info!(
        "{}",
        l10n.format("results_saved", &[("path", config.output_file.display().to_string().as_str())])
    );
    logging::print_final_stats(output.len(), table.len(), &config.output_file);
    Ok(())
}

/// 配置错误的本地化提示
fn localize(l10n: &Localization, error: &ConfigError) -> String {
    match error {
        ConfigError::MissingColumns { missing } => {
            l10n.format(error.message_key(), &[("columns", missing.join(", ").as_str())])
        }
        other => l10n.get(other.message_key()),
    }
}
