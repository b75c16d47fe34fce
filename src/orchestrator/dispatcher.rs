//! 工作项派发 - 编排层
//!
//! 按序号把工作项分配到槽位（`index % pool_size`），每个工作项产生恰好一个结果。

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::ItemError;
use crate::models::work_item::{TaskOutcome, WorkItem};
use crate::orchestrator::scheduler::SlotScheduler;
use crate::services::agent::BrowserAgent;
use crate::workflow::{ItemCtx, ItemFlow};

/// 已派发、尚未收集的一批任务
pub struct PendingBatch {
    pub dispatched: usize,
    pub results: mpsc::UnboundedReceiver<TaskOutcome>,
}

/// 工作项序号对应的槽位
pub fn slot_for(index: usize, pool_size: usize) -> usize {
    index % pool_size
}

/// 按顺序派发所有工作项，立即返回
///
/// 当所有任务结束后结果通道关闭
pub fn dispatch<A: BrowserAgent>(
    scheduler: &SlotScheduler<A::Handle>,
    flow: Arc<ItemFlow<A>>,
    items: Vec<WorkItem>,
) -> PendingBatch {
    let (tx, rx) = mpsc::unbounded_channel();
    let dispatched = items.len();
    let pool_size = scheduler.size();

    info!("📦 派发 {} 个工作项到 {} 个槽位", dispatched, pool_size);

    for item in items {
        let slot = slot_for(item.index(), pool_size);
        let index = item.index();
        let flow = flow.clone();
        let job_tx = tx.clone();

        let submitted = scheduler.submit(slot, move |handle| {
            async move {
                let ctx = ItemCtx::new(&item, Some(slot));
                let outcome = flow.run(&item, &handle, &ctx).await;
                let _ = job_tx.send(outcome);
            }
            .boxed()
        });

        if let Err(e) = submitted {
            error!("[#{}] ❌ 无法提交到槽位 {}: {}", index, slot, e);
            let _ = tx.send(TaskOutcome::Dropped {
                index,
                reason: ItemError::Aborted(e.to_string()),
            });
        }
    }

    PendingBatch { dispatched, results: rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::OutputSchema;
    use crate::orchestrator::limiter::ConcurrencyLimiter;
    use crate::orchestrator::resource_pool::{PoolResource, ResourcePool};
    use crate::services::prompt::PromptTemplate;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value as JsonValue};
    use std::sync::Mutex;

    struct SlotHandle(usize);

    #[async_trait]
    impl PoolResource for SlotHandle {
        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    /// 记录 (任务, 槽位)
    #[derive(Default)]
    struct RecordingAgent {
        seen: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl BrowserAgent for RecordingAgent {
        type Handle = SlotHandle;

        async fn run(&self, task: &str, handle: &SlotHandle) -> Result<JsonValue> {
            self.seen.lock().unwrap().push((task.to_string(), handle.0));
            Ok(json!({}))
        }
    }

    #[test]
    fn test_slot_for_round_robin() {
        let slots: Vec<usize> = (0..7).map(|i| slot_for(i, 3)).collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[tokio::test]
    async fn test_items_run_on_their_slot() {
        let pool = Arc::new(ResourcePool::from_handles(vec![SlotHandle(0), SlotHandle(1), SlotHandle(2)]).unwrap());
        let scheduler = SlotScheduler::start(&pool, ConcurrencyLimiter::new(3).unwrap()).unwrap();
        let agent = Arc::new(RecordingAgent::default());
        let flow = Arc::new(ItemFlow::new(agent.clone(), PromptTemplate::new("{key}"), OutputSchema::default()));

        let items = (0..7)
            .map(|i| WorkItem::new(i, json!({"key": format!("k{}", i)}).as_object().cloned().unwrap()))
            .collect();
        let mut batch = dispatch(&scheduler, flow, items);
        assert_eq!(batch.dispatched, 7);

        let mut received = 0;
        while batch.results.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 7);
        scheduler.shutdown().await;

        let mut seen = agent.seen.lock().unwrap().clone();
        seen.sort();
        for (task, slot) in seen {
            let index: usize = task.trim_start_matches('k').parse().unwrap();
            assert_eq!(slot, index % 3);
        }
    }
}
