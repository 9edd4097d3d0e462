//! Fixed mode: a known list of items through the worker pool.

use std::sync::Arc;

use crate::core::WorkerPool;
use crate::error::RunError;
use crate::items::StaticItems;
use crate::modes::RunContext;
use crate::processor::UppercaseFile;

pub(crate) async fn run(ctx: &RunContext) -> Result<(), RunError> {
    let cfg = &ctx.config;
    let items = StaticItems::load(&cfg.items, cfg.items_file.as_deref(), &cfg.input_dir).await?;
    tracing::info!(count = items.len(), "static items loaded");
    for item in items.as_slice() {
        tracing::debug!(item = item.id(), locator = item.locator(), "queued");
    }

    let pool = WorkerPool::new(cfg.max_concurrency, ctx.retry());
    let processor = Arc::new(UppercaseFile::new(&cfg.output_dir));
    let report = pool.run(items.into_stream(), processor, &ctx.token).await?;

    tracing::info!(completed = report.completed, "fixed run done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RunMode};
    use crate::events::Bus;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx(dir: &std::path::Path, items: Vec<String>, file: Option<&str>) -> RunContext {
        let config = Config {
            mode: RunMode::Fixed,
            items,
            items_file: file.map(|f| dir.join(f)),
            input_dir: dir.to_path_buf(),
            output_dir: dir.to_path_buf(),
            max_concurrency: 2,
            retry_max: 1,
            retry_backoff: Duration::from_millis(1),
            retry_backoff_cap: Duration::from_millis(1),
            ..Config::default()
        };
        RunContext::new(config, Bus::new(256), CancellationToken::new())
    }

    #[tokio::test]
    async fn values_then_file_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.join("b.txt"), "beta").unwrap();
        std::fs::write(dir.join("list"), "b.txt\n\n").unwrap();

        let values = vec![dir.join("a.txt").display().to_string()];
        run(&ctx(dir, values, Some("list"))).await.unwrap();

        assert_eq!(std::fs::read_to_string(dir.join("output-val-0.txt")).unwrap(), "ALPHA");
        assert_eq!(std::fs::read_to_string(dir.join("output-file-1.txt")).unwrap(), "BETA");
    }

    #[tokio::test]
    async fn unreadable_items_file_is_source_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let err = run(&ctx(dir, Vec::new(), Some("absent"))).await.unwrap_err();
        assert_eq!(err.as_label(), "item_source");
    }

    #[tokio::test]
    async fn failing_item_fails_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let values = vec![dir.join("missing.txt").display().to_string()];
        let err = run(&ctx(dir, values, None)).await.unwrap_err();
        assert!(matches!(err, RunError::ItemFailed { ref item, .. } if item == "val-0"));
    }
}
