//! # Sample transform: uppercase a text file.
//!
//! Reads the item's locator as a path, uppercases the content and writes it to
//! `out_dir/output-{id}.txt`. Rewriting the same output is harmless, so the
//! transform is safe to retry.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ProcessError;
use crate::items::WorkItem;
use crate::processor::Processor;

/// Uppercases input files into an output directory.
#[derive(Clone, Debug)]
pub struct UppercaseFile {
    out_dir: PathBuf,
}

impl UppercaseFile {
    /// Creates the transform writing into `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Output path for an item.
    pub fn output_path(&self, item: &WorkItem) -> PathBuf {
        self.out_dir.join(format!("output-{}.txt", item.id()))
    }
}

#[async_trait]
impl Processor for UppercaseFile {
    async fn process(
        &self,
        item: &WorkItem,
        token: &CancellationToken,
    ) -> Result<(), ProcessError> {
        if token.is_cancelled() {
            return Err(ProcessError::Canceled);
        }

        let data = tokio::fs::read_to_string(item.locator())
            .await
            .map_err(|e| ProcessError::fail(format!("read input ({}): {e}", item.locator())))?;

        let out = self.output_path(item);
        tokio::fs::write(&out, data.to_uppercase())
            .await
            .map_err(|e| ProcessError::fail(format!("write output ({}): {e}", out.display())))?;

        tracing::debug!(item = item.id(), output = %out.display(), "uppercased");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_uppercased_output() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let input = dir.join("input-03.txt");
        std::fs::write(&input, "hello ring\n").unwrap();

        let p = UppercaseFile::new(dir);
        let item = WorkItem::new("3", input.display().to_string());
        p.process(&item, &CancellationToken::new()).await.unwrap();

        let out = std::fs::read_to_string(dir.join("output-3.txt")).unwrap();
        assert_eq!(out, "HELLO RING\n");
    }

    #[tokio::test]
    async fn missing_input_is_retryable() {
        let tmp = tempfile::tempdir().unwrap();
        let p = UppercaseFile::new(tmp.path());
        let item = WorkItem::new("x", "/nonexistent/input.txt");
        let err = p.process(&item, &CancellationToken::new()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let tmp = tempfile::tempdir().unwrap();
        let p = UppercaseFile::new(tmp.path());
        let item = WorkItem::new("x", "/nonexistent/input.txt");
        assert_eq!(p.process(&item, &token).await, Err(ProcessError::Canceled));
    }
}
