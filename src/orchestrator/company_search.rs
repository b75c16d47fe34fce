//! 公司搜索 - 编排层
//!
//! ## 两阶段流程
//!
//! 1. **发现**：在 0 号槽位上运行一次搜索任务，从公开目录中找出公司列表
//! 2. **分析**：把每家公司派发到 `index % N` 槽位，访问官网判断办公室分布
//!
//! 多个查询并发执行，共用同一个调度器；结果按查询顺序拼接，不去重。

use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use serde_json::{json, Map, Value as JsonValue};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::config::SearchSettings;
use crate::error::AppResult;
use crate::models::schema::{FieldKind, OutputField, OutputSchema};
use crate::models::work_item::{value_to_text, ResultSet, WorkItem};
use crate::orchestrator::limiter::ConcurrencyLimiter;
use crate::orchestrator::resource_pool::{HandleLauncher, ResourcePool};
use crate::orchestrator::scheduler::SlotScheduler;
use crate::orchestrator::{collector, dispatcher};
use crate::services::agent::BrowserAgent;
use crate::services::prompt::PromptTemplate;
use crate::workflow::ItemFlow;
use crate::utils::logging;

/// 发现阶段固定使用的槽位
pub const DISCOVERY_SLOT: usize = 0;

const DISCOVERY_TASK: &str = r#"Follow these steps exactly:
1. Open https://www.google.com
2. Wait for the page to load
3. Search for "{query} companies list directory"
4. IMPORTANT: Avoid high-risk websites that often block bots:
   - Avoid F6S, Crunchbase, LinkedIn, AngelList
   - Prefer local business directories, government sites, or local industry associations
   - Look for comprehensive lists, not just "top" companies
5. If a page blocks access or seems risky:
   - Go back to the Google results
   - Try another source from the results
   - Repeat until you find an accessible source
6. From the found source, extract as many companies as possible (not just the top 5)
7. For each company collect:
   - Company name
   - Official website URL (not social media profiles)
8. Return the data as a JSON list with fields: name, website
9. If no data was extracted, go back to step 3 and try different search terms like:
   - "{query} business directory"
   - "{query} company registry"
   - "list of {query}""#;

const ANALYSIS_TASK: &str = r#"Follow these steps exactly:
1. Open {website}
2. Wait for the page to load
3. If the page blocks access, stop and return the blocked answer from step 7
4. Look for company information:
   - Check footer links first (they often have location info)
   - Look for "Contact", "About", "Locations", "Global Presence"
   - Check for office locations in Brazil and Argentina
5. If the main page doesn't have enough info:
   - Try the "Contact" or "About" pages
   - Look for "Global" or "International" sections
6. Return a JSON object with fields:
   - has_offices (boolean)
   - brazil_office (boolean)
   - argentina_office (boolean)
   - all_locations (list of strings)
   - brief (string, max 500 chars)
7. If blocked or an error occurs, return:
   {"error": "access_blocked"}"#;

/// 公司分析结果的 schema
pub fn company_schema() -> OutputSchema {
    OutputSchema::new(vec![
        OutputField::new("has_offices", FieldKind::Bool, json!(false)),
        OutputField::new("brazil_office", FieldKind::Bool, json!(false)),
        OutputField::new("argentina_office", FieldKind::Bool, json!(false)),
        OutputField::new("all_locations", FieldKind::List, json!("")),
        OutputField::new(
            "brief",
            FieldKind::Text { max_chars: Some(500) },
            json!("Analysis failed"),
        ),
    ])
}

/// 输出表的列顺序
pub fn company_columns() -> Vec<String> {
    let mut columns = vec!["name".to_string(), "website".to_string()];
    columns.extend(company_schema().column_names());
    columns
}

/// 发现阶段的任务描述
pub fn discovery_task(query: &str) -> String {
    DISCOVERY_TASK.replace("{query}", query)
}

/// 宽松解析发现阶段返回的公司列表
///
/// 接受数组、带 `companies` 数组的对象、或包在文本里的 JSON；
/// 没有 website 的条目被跳过
pub fn parse_companies(response: &JsonValue) -> Vec<WorkItem> {
    let parsed;
    let value = match response {
        JsonValue::String(text) => match crate::services::llm_service::parse_structured_answer(text) {
            Ok(value) => {
                parsed = value;
                &parsed
            }
            Err(_) => return Vec::new(),
        },
        other => other,
    };

    let entries: &[JsonValue] = match value {
        JsonValue::Array(entries) => entries.as_slice(),
        JsonValue::Object(object) => match object.get("companies") {
            Some(JsonValue::Array(entries)) => entries.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    entries
        .iter()
        .filter_map(|entry| {
            let object = entry.as_object()?;
            let website = object.get("website").map(value_to_text).unwrap_or_default();
            if website.trim().is_empty() {
                return None;
            }
            let name = object.get("name").map(value_to_text).unwrap_or_default();
            let mut fields = Map::new();
            fields.insert("name".into(), JsonValue::String(name));
            fields.insert("website".into(), JsonValue::String(website.trim().to_string()));
            Some(fields)
        })
        .enumerate()
        .map(|(index, fields)| WorkItem::new(index, fields))
        .collect()
}

/// 公司搜索器
pub struct CompanySearcher<'a, A: BrowserAgent> {
    agent: Arc<A>,
    scheduler: &'a SlotScheduler<A::Handle>,
    analysis: Arc<ItemFlow<A>>,
}

impl<'a, A: BrowserAgent> CompanySearcher<'a, A> {
    pub fn new(agent: Arc<A>, scheduler: &'a SlotScheduler<A::Handle>) -> Self {
        let analysis = Arc::new(ItemFlow::new(
            agent.clone(),
            PromptTemplate::new(ANALYSIS_TASK),
            company_schema(),
        ));
        Self {
            agent,
            scheduler,
            analysis,
        }
    }

    /// 发现阶段：失败时记 error 并返回空列表
    pub async fn discover(&self, query: &str) -> Vec<WorkItem> {
        let (tx, rx) = oneshot::channel();
        let agent = self.agent.clone();
        let task = discovery_task(query);

        let submitted = self.scheduler.submit(DISCOVERY_SLOT, move |handle| {
            async move {
                let _ = tx.send(agent.run(&task, &handle).await);
            }
            .boxed()
        });
        if let Err(e) = submitted {
            error!("[{}] ❌ 无法提交发现任务: {}", query, e);
            return Vec::new();
        }

        match rx.await {
            Ok(Ok(response)) => {
                let companies = parse_companies(&response);
                info!("[{}] ✓ 发现 {} 家公司", query, companies.len());
                companies
            }
            Ok(Err(e)) => {
                error!("[{}] ❌ 发现阶段失败: {:#}", query, e);
                Vec::new()
            }
            Err(_) => {
                error!("[{}] ❌ 发现任务异常中止", query);
                Vec::new()
            }
        }
    }

    /// 单个查询的完整流程
    pub async fn search_and_analyze(&self, query: &str) -> ResultSet {
        info!("🔍 开始搜索: {}", query);
        let companies = self.discover(query).await;
        if companies.is_empty() {
            warn!("[{}] ⚠️ 没有发现任何公司", query);
            return ResultSet::new();
        }

        let batch = dispatcher::dispatch(self.scheduler, self.analysis.clone(), companies);
        let (results, stats) = collector::collect(batch).await;
        logging::log_batch_complete(query, stats.succeeded, stats.dispatched);
        results
    }

    /// 并发执行所有查询，结果按查询顺序拼接
    pub async fn search_all(&self, queries: &[String]) -> ResultSet {
        let per_query = join_all(queries.iter().map(|q| self.search_and_analyze(q))).await;
        let mut all = ResultSet::new();
        for results in per_query {
            all.extend(results);
        }
        all
    }
}

/// 启动浏览器池、执行所有查询，并在任何路径上释放浏览器
pub async fn run_company_search<L, A>(
    settings: &SearchSettings,
    queries: &[String],
    launcher: &L,
    agent: A,
) -> AppResult<ResultSet>
where
    A: BrowserAgent,
    L: HandleLauncher<Handle = A::Handle>,
{
    if queries.is_empty() {
        warn!("⚠️ 没有配置搜索查询");
        return Ok(ResultSet::new());
    }

    let limiter = ConcurrencyLimiter::new(settings.max_parallel)?;
    let pool = Arc::new(ResourcePool::launch(settings.max_parallel, launcher).await?);
    let scheduler = match SlotScheduler::start(&pool, limiter) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            pool.release_all().await;
            return Err(e);
        }
    };

    let results = CompanySearcher::new(Arc::new(agent), &scheduler)
        .search_all(queries)
        .await;

    scheduler.shutdown().await;
    pool.release_all().await;
    info!("✓ 公司搜索完成，共 {} 条结果", results.len());
    Ok(results)
}
