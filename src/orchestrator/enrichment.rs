//! 表格增强 - 编排层
//!
//! 按 profile 对输入表的每一行执行一次任务，把产出的列追加到原始行上。
//!
//! - 在线模式：浏览器池 + 槽位调度，与公司搜索共用派发/收集逻辑
//! - 离线模式：每行直接调用一次模型，不启动浏览器
//!
//! 所有配置检查都在启动任何资源之前完成。

use std::sync::Arc;

use futures::{stream, StreamExt};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::{AppResult, ConfigError};
use crate::infrastructure::credentials::ApiKeys;
use crate::models::catalog::find_model;
use crate::models::profile::Profile;
use crate::models::table::Table;
use crate::models::work_item::{ResultSet, WorkItem};
use crate::orchestrator::collector::{self, collect_outcomes};
use crate::orchestrator::dispatcher;
use crate::orchestrator::limiter::ConcurrencyLimiter;
use crate::orchestrator::resource_pool::{HandleLauncher, ResourcePool};
use crate::orchestrator::scheduler::SlotScheduler;
use crate::services::agent::BrowserAgent;
use crate::services::llm_service::CompletionModel;
use crate::services::prompt::PromptTemplate;
use crate::utils::logging;
use crate::workflow::{interpret, ItemCtx, ItemFlow};

/// 一次增强运行的输入
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentRequest<'a> {
    pub profile: &'a Profile,
    pub table: &'a Table,
    pub api_keys: &'a ApiKeys,
}

/// 运行前的全部检查
pub fn validate_request(request: &EnrichmentRequest<'_>) -> Result<(), ConfigError> {
    let profile = request.profile;

    let spec = find_model(&profile.model).ok_or_else(|| ConfigError::UnknownModel {
        model: profile.model.clone(),
    })?;
    if request.api_keys.key_for(spec.provider).is_none() {
        return Err(ConfigError::MissingApiKey {
            model: profile.model.clone(),
            provider: spec.provider.name().to_string(),
        });
    }
    if profile.prompt.trim().is_empty() {
        return Err(ConfigError::EmptyPrompt {
            profile: profile.name.clone(),
        });
    }
    if profile.output_columns.is_empty() {
        return Err(ConfigError::NoOutputColumns {
            profile: profile.name.clone(),
        });
    }
    if profile.use_browser && profile.browser_config.is_none() {
        return Err(ConfigError::MissingBrowserConfig {
            profile: profile.name.clone(),
        });
    }
    profile.validate()?;

    let missing = request.table.missing_columns(&profile.input_columns);
    if !missing.is_empty() {
        return Err(ConfigError::MissingColumns { missing });
    }
    Ok(())
}

/// 输出表的列：输入列 + profile 输出列（已存在的不重复）
pub fn output_columns(profile: &Profile, table: &Table) -> Vec<String> {
    let mut columns = table.columns.clone();
    for column in &profile.output_columns {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

/// 执行一次增强，返回按输入顺序排列的输出表
pub async fn run_enrichment<L, A, M>(
    request: EnrichmentRequest<'_>,
    offline_concurrency: usize,
    launcher: &L,
    agent: A,
    model: M,
) -> AppResult<Table>
where
    A: BrowserAgent,
    L: HandleLauncher<Handle = A::Handle>,
    M: CompletionModel,
{
    validate_request(&request)?;
    let profile = request.profile;
    let columns = output_columns(profile, request.table);

    let items = request.table.to_work_items();
    if items.is_empty() {
        warn!("⚠️ 输入表没有任何数据行");
        return Ok(Table::new(columns));
    }

    let template = PromptTemplate::new(profile.prompt.clone());
    let schema = profile.output_schema();
    info!(
        "🚀 开始处理 profile {} ({} 行, 模式: {})",
        profile.name,
        items.len(),
        if profile.use_browser { "浏览器" } else { "离线" }
    );

    let results = match (&profile.browser_config, profile.use_browser) {
        (Some(settings), true) => {
            let limiter = ConcurrencyLimiter::new(settings.max_parallel)?;
            let pool = Arc::new(ResourcePool::launch(settings.max_parallel, launcher).await?);
            let scheduler = match SlotScheduler::start(&pool, limiter) {
                Ok(scheduler) => scheduler,
                Err(e) => {
                    pool.release_all().await;
                    return Err(e);
                }
            };

            let flow = Arc::new(ItemFlow::new(Arc::new(agent), template, schema));
            let batch = dispatcher::dispatch(&scheduler, flow, items);
            let (results, stats) = collector::collect(batch).await;
            logging::log_batch_complete(&profile.name, stats.succeeded, stats.dispatched);

            scheduler.shutdown().await;
            pool.release_all().await;
            results
        }
        _ => run_offline(items, offline_concurrency.max(1), &template, &schema, &model).await,
    };

    Ok(Table::from_records(columns, results.into_input_order()))
}

async fn run_offline<M: CompletionModel>(
    items: Vec<WorkItem>,
    concurrency: usize,
    template: &PromptTemplate,
    schema: &crate::models::schema::OutputSchema,
    model: &M,
) -> ResultSet {
    let outcomes: Vec<_> = stream::iter(items)
        .map(|item| async move {
            let ctx = ItemCtx::new(&item, None);
            let prompt = template.render(&item);
            let response = model.complete(&prompt, None).await.map(JsonValue::String);
            interpret(schema, &item, &ctx, response)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let (results, stats) = collect_outcomes(outcomes);
    info!(
        "📊 离线处理完成: {} 行, 成功 {}, 丢弃 {}",
        stats.dispatched, stats.succeeded, stats.dropped
    );
    if results.is_empty() {
        warn!("⚠️ 没有任何结果");
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::BrowserSettings;
    use crate::orchestrator::resource_pool::PoolResource;
    use crate::utils::logging::capture::LogCapture;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeHandle;

    #[async_trait]
    impl PoolResource for FakeHandle {
        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingLauncher {
        launched: AtomicUsize,
    }

    #[async_trait]
    impl HandleLauncher for CountingLauncher {
        type Handle = FakeHandle;

        async fn launch(&self, _slot: usize) -> Result<FakeHandle> {
            self.launched.fetch_add(1, Ordering::SeqCst);
            Ok(FakeHandle)
        }
    }

    /// 任务文本形如 "row N"；N 为奇数时报告被拦截，N 越小耗时越长
    struct SlowFirstAgent {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserAgent for SlowFirstAgent {
        type Handle = FakeHandle;

        async fn run(&self, task: &str, _handle: &FakeHandle) -> Result<JsonValue> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n: u64 = task.trim_start_matches("row ").parse()?;
            tokio::time::sleep(Duration::from_millis(5 * (6 - n))).await;
            if n % 2 == 1 {
                return Ok(json!({"error": "access_blocked"}));
            }
            Ok(json!({"city": format!("city-{}", n)}))
        }
    }

    struct EchoModel;

    #[async_trait]
    impl CompletionModel for EchoModel {
        async fn complete(&self, prompt: &str, _system: Option<&str>) -> Result<String> {
            Ok(format!("```json\n{{\"city\": \"{}\"}}\n```", prompt.to_uppercase()))
        }
    }

    fn profile(use_browser: bool) -> Profile {
        Profile {
            name: "cities".into(),
            description: String::new(),
            input_columns: vec!["id".into()],
            prompt: "row {id}".into(),
            output_columns: vec!["city".into()],
            model: "gpt-4o-mini".into(),
            temperature: 0.0,
            use_browser,
            browser_config: Some(BrowserSettings {
                max_parallel: 2,
                ..Default::default()
            }),
        }
    }

    fn table(rows: usize) -> Table {
        let mut table = Table::new(vec!["id".into(), "note".into()]);
        for i in 0..rows {
            let mut row = Map::new();
            row.insert("id".into(), json!(i));
            row.insert("note".into(), json!(format!("n{}", i)));
            table.rows.push(row);
        }
        table
    }

    fn keys() -> ApiKeys {
        ApiKeys {
            openai: Some("sk-test".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_output_columns_not_repeated() {
        let mut p = profile(true);
        p.output_columns = vec!["note".into(), "city".into()];
        assert_eq!(output_columns(&p, &table(0)), vec!["id", "note", "city"]);
    }

    #[test]
    fn test_validate_request_errors() {
        let t = table(1);
        let k = keys();

        let mut p = profile(true);
        p.model = "gpt-9".into();
        let request = EnrichmentRequest { profile: &p, table: &t, api_keys: &k };
        assert_eq!(
            validate_request(&request),
            Err(ConfigError::UnknownModel { model: "gpt-9".into() })
        );

        let mut p = profile(true);
        p.model = "gemini-1.5-flash".into();
        let request = EnrichmentRequest { profile: &p, table: &t, api_keys: &k };
        assert!(matches!(validate_request(&request), Err(ConfigError::MissingApiKey { .. })));

        let mut p = profile(true);
        p.prompt = "   ".into();
        let request = EnrichmentRequest { profile: &p, table: &t, api_keys: &k };
        assert!(matches!(validate_request(&request), Err(ConfigError::EmptyPrompt { .. })));

        let mut p = profile(true);
        p.browser_config = None;
        let request = EnrichmentRequest { profile: &p, table: &t, api_keys: &k };
        assert!(matches!(validate_request(&request), Err(ConfigError::MissingBrowserConfig { .. })));

        let mut p = profile(false);
        p.browser_config = None;
        let request = EnrichmentRequest { profile: &p, table: &t, api_keys: &k };
        assert!(validate_request(&request).is_ok());
    }

    #[tokio::test]
    async fn test_missing_columns_reported_before_any_work() {
        let mut p = profile(true);
        p.input_columns = vec!["id".into(), "website".into(), "country".into()];
        let t = table(3);
        let k = keys();
        let launcher = CountingLauncher::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let result = run_enrichment(
            EnrichmentRequest { profile: &p, table: &t, api_keys: &k },
            4,
            &launcher,
            SlowFirstAgent { calls: calls.clone() },
            EchoModel,
        )
        .await;

        assert!(matches!(
            result,
            Err(crate::error::AppError::Config(ConfigError::MissingColumns { ref missing }))
                if missing == &vec!["website".to_string(), "country".to_string()]
        ));
        assert_eq!(launcher.launched.load(Ordering::SeqCst), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_online_preserves_input_order_and_drops_blocked() {
        let (logs, _guard) = LogCapture::start();
        let p = profile(true);
        let t = table(5);
        let k = keys();
        let launcher = CountingLauncher::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let output = run_enrichment(
            EnrichmentRequest { profile: &p, table: &t, api_keys: &k },
            4,
            &launcher,
            SlowFirstAgent { calls: calls.clone() },
            EchoModel,
        )
        .await
        .unwrap();

        assert_eq!(launcher.launched.load(Ordering::SeqCst), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(output.columns, vec!["id", "note", "city"]);
        let ids: Vec<JsonValue> = output.rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(0), json!(2), json!(4)]);
        assert_eq!(output.rows[1]["city"], json!("city-2"));
        assert_eq!(output.rows[1]["note"], json!("n2"));

        let warnings = logs.lines_at("WARN");
        assert_eq!(warnings.len(), 2, "{:?}", warnings);
        assert!(warnings.iter().all(|line| line.contains("访问被拦截")));
        assert!(warnings.iter().any(|line| line.contains("#1")));
        assert!(warnings.iter().any(|line| line.contains("#3")));
    }

    #[tokio::test]
    async fn test_offline_mode_uses_model_without_pool() {
        let p = profile(false);
        let t = table(3);
        let k = keys();
        let launcher = CountingLauncher::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let output = run_enrichment(
            EnrichmentRequest { profile: &p, table: &t, api_keys: &k },
            2,
            &launcher,
            SlowFirstAgent { calls: calls.clone() },
            EchoModel,
        )
        .await
        .unwrap();

        assert_eq!(launcher.launched.load(Ordering::SeqCst), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(output.len(), 3);
        assert_eq!(output.rows[2]["city"], json!("ROW 2"));
    }

    #[tokio::test]
    async fn test_offline_zero_rows() {
        let (logs, _guard) = LogCapture::start();
        let p = profile(false);
        let t = table(0);
        let k = keys();
        let launcher = CountingLauncher::default();

        let output = run_enrichment(
            EnrichmentRequest { profile: &p, table: &t, api_keys: &k },
            2,
            &launcher,
            SlowFirstAgent {
                calls: Arc::new(AtomicUsize::new(0)),
            },
            EchoModel,
        )
        .await
        .unwrap();

        assert!(output.is_empty());
        assert_eq!(output.columns, vec!["id", "note", "city"]);
        assert_eq!(launcher.launched.load(Ordering::SeqCst), 0);
        let warnings = logs.lines_at("WARN");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("没有任何数据行"));
    }
}
