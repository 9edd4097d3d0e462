//! Queue mode: drain a Redis list with `max_concurrency` workers.

use std::sync::Arc;

use crate::core::QueueDrainCoordinator;
use crate::error::RunError;
use crate::items::{RedisQueue, WorkQueue};
use crate::modes::RunContext;
use crate::processor::UppercaseFile;

pub(crate) async fn run(ctx: &RunContext) -> Result<(), RunError> {
    let cfg = &ctx.config;
    let key = cfg
        .queue_key
        .clone()
        .ok_or_else(|| RunError::config("QUEUE_KEY", "required in queue mode"))?;

    tracing::info!(url = %cfg.queue_url, key = %key, "opening queue");
    let queue: Arc<dyn WorkQueue> = Arc::new(RedisQueue::open(&cfg.queue_url, key)?);
    drain(ctx, queue).await
}

/// Drains `queue` and holds when at least one item succeeded.
pub(crate) async fn drain(ctx: &RunContext, queue: Arc<dyn WorkQueue>) -> Result<(), RunError> {
    let cfg = &ctx.config;
    let coordinator =
        QueueDrainCoordinator::new(queue, cfg.max_concurrency, cfg.queue_wait, ctx.retry());
    let processor = Arc::new(UppercaseFile::new(&cfg.output_dir));

    let report = coordinator.run(processor, &ctx.token).await?;
    if report.failed > 0 {
        tracing::warn!(failed = report.failed, "some items were abandoned");
    }
    if report.should_hold() {
        ctx.hold().await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RunMode};
    use crate::events::{Bus, EventKind};
    use crate::items::QueueError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct ListQueue(Mutex<Vec<String>>);

    #[async_trait]
    impl WorkQueue for ListQueue {
        fn name(&self) -> &str {
            "list"
        }

        async fn pending(&self) -> Result<u64, QueueError> {
            Ok(self.0.lock().unwrap().len() as u64)
        }

        async fn pop(&self, wait: Duration) -> Result<Option<String>, QueueError> {
            let next = self.0.lock().unwrap().pop();
            if next.is_none() {
                tokio::time::sleep(wait).await;
            }
            Ok(next)
        }
    }

    fn ctx(dir: &std::path::Path) -> RunContext {
        let config = Config {
            mode: RunMode::Queue,
            queue_key: Some("list".into()),
            queue_wait: Duration::from_millis(20),
            output_dir: dir.to_path_buf(),
            max_concurrency: 2,
            retry_max: 1,
            hold_for: Duration::from_millis(5),
            ..Config::default()
        };
        RunContext::new(config, Bus::new(256), CancellationToken::new())
    }

    #[tokio::test]
    async fn drains_and_holds_after_success() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("input-1.txt"), "one").unwrap();
        let payloads = vec![
            dir.join("input-1.txt").display().to_string(),
            dir.join("missing.txt").display().to_string(),
        ];
        let queue = Arc::new(ListQueue(Mutex::new(payloads)));

        let ctx = ctx(dir);
        let mut rx = ctx.bus.subscribe();
        drain(&ctx, queue).await.unwrap();

        assert_eq!(std::fs::read_to_string(dir.join("output-input-1.txt")).unwrap(), "ONE");
        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::ItemAbandoned));
        assert!(kinds.contains(&EventKind::HoldStarted));
    }

    #[tokio::test]
    async fn empty_queue_does_not_hold() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let ctx = ctx(dir);
        let mut rx = ctx.bus.subscribe();

        drain(&ctx, Arc::new(ListQueue(Mutex::new(Vec::new()))))
            .await
            .unwrap();

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind).collect();
        assert!(!kinds.contains(&EventKind::HoldStarted));
    }
}
