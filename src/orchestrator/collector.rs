//! 结果收集 - 编排层
//!
//! 等待一批任务全部结束，把成功的结果收集为 `ResultSet`。
//! 单个任务失败不会取消其它任务；空结果只记 warn。

use tracing::{info, warn};

use crate::models::work_item::{ResultSet, TaskOutcome};
use crate::orchestrator::dispatcher::PendingBatch;

/// 批次统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub dispatched: usize,
    pub succeeded: usize,
    pub dropped: usize,
}

/// 汇总一组已知的任务结果
pub fn collect_outcomes<I>(outcomes: I) -> (ResultSet, BatchStats)
where
    I: IntoIterator<Item = TaskOutcome>,
{
    let mut results = ResultSet::new();
    let mut stats = BatchStats::default();
    for outcome in outcomes {
        stats.dispatched += 1;
        match outcome {
            TaskOutcome::Succeeded(record) => {
                stats.succeeded += 1;
                results.push(record);
            }
            TaskOutcome::Dropped { .. } => stats.dropped += 1,
        }
    }
    (results, stats)
}

/// 等待批次中所有任务结束，返回结果和统计
pub async fn collect(batch: PendingBatch) -> (ResultSet, BatchStats) {
    let PendingBatch {
        dispatched,
        mut results,
    } = batch;

    let mut outcomes = Vec::with_capacity(dispatched);
    while let Some(outcome) = results.recv().await {
        outcomes.push(outcome);
    }

    let (result_set, mut stats) = collect_outcomes(outcomes);
    // 任务 panic 或 worker 提前退出时不会发送结果
    if stats.dispatched < dispatched {
        let missing = dispatched - stats.dispatched;
        warn!("⚠️ {} 个任务没有返回结果，按丢弃处理", missing);
        stats.dropped += missing;
        stats.dispatched = dispatched;
    }

    info!(
        "📊 批次完成: 派发 {}, 成功 {}, 丢弃 {}",
        stats.dispatched, stats.succeeded, stats.dropped
    );
    if result_set.is_empty() {
        warn!("⚠️ 没有任何结果");
    }
    (result_set, stats)
}
