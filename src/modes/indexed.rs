//! Indexed mode: each job member processes the input selected by its index.

use std::sync::Arc;

use crate::error::{ProcessError, RunError};
use crate::items::WorkItem;
use crate::modes::RunContext;
use crate::processor::{Processor, UppercaseFile};

/// Item for member `index`: `input_dir/input-{index:02}.txt`, id `{index}`.
fn item_for(ctx: &RunContext, index: usize) -> WorkItem {
    let path = ctx.config.input_dir.join(format!("input-{index:02}.txt"));
    WorkItem::new(index.to_string(), path.display().to_string())
}

pub(crate) async fn run(ctx: &RunContext) -> Result<(), RunError> {
    let index = ctx
        .config
        .job_index
        .ok_or_else(|| RunError::config("JOB_INDEX", "required in indexed mode"))?;

    let item = item_for(ctx, index);
    let processor = Arc::new(UppercaseFile::new(&ctx.config.output_dir));
    tracing::info!(index, input = item.locator(), "processing indexed input");

    let res = ctx
        .retry()
        .execute(item.id(), &ctx.token, |_| processor.process(&item, &ctx.token))
        .await;

    match res {
        Ok(()) => {
            tracing::info!(index, output = %processor.output_path(&item).display(), "indexed input done");
            ctx.hold().await;
            Ok(())
        }
        Err(ProcessError::Canceled) => Err(RunError::Cancelled),
        Err(source) => Err(RunError::ItemFailed {
            item: item.id().to_string(),
            source,
        }),
    }
}
