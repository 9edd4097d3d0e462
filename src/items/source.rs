//! # Static item source.
//!
//! Builds the ordered item list for the fixed pool:
//! explicit values first (`val-{i}`), then one item per non-blank line of an
//! items file (`file-{n}`, numbering continues after the values), resolved
//! against the input directory.

use std::path::{Path, PathBuf};

use futures::stream::{self, Stream};

use crate::error::RunError;
use crate::items::WorkItem;

/// Ordered, fully-known item list.
#[derive(Clone, Debug, Default)]
pub struct StaticItems {
    items: Vec<WorkItem>,
}

impl StaticItems {
    /// Wraps an already-built list.
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self { items }
    }

    /// Loads explicit values and, optionally, an items file.
    ///
    /// Relative file entries are joined onto `input_dir`; absolute ones are kept.
    pub async fn load(
        values: &[String],
        items_file: Option<&Path>,
        input_dir: &Path,
    ) -> Result<Self, RunError> {
        let mut items: Vec<WorkItem> = values
            .iter()
            .enumerate()
            .map(|(i, v)| WorkItem::new(format!("val-{i}"), v.clone()))
            .collect();

        if let Some(path) = items_file {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| RunError::Source {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
            let mut n = items.len();
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let locator: PathBuf = input_dir.join(line);
                items.push(WorkItem::new(
                    format!("file-{n}"),
                    locator.display().to_string(),
                ));
                n += 1;
            }
        }

        tracing::debug!(count = items.len(), "static items loaded");
        Ok(Self { items })
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there is nothing to process.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in offer order.
    pub fn as_slice(&self) -> &[WorkItem] {
        &self.items
    }

    /// Lazy stream over the items, in offer order.
    pub fn into_stream(self) -> impl Stream<Item = WorkItem> + Send + Unpin {
        stream::iter(self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn list_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn values_then_file_lines_with_continued_numbering() {
        let list = list_file("a.txt\n\n  b.txt  \n/abs/c.txt\n");
        let values = vec!["/x/one.txt".to_string(), "/x/two.txt".to_string()];

        let items = StaticItems::load(&values, Some(list.path()), Path::new("/in"))
            .await
            .unwrap();
        let ids: Vec<&str> = items.as_slice().iter().map(|i| i.id()).collect();
        assert_eq!(ids, ["val-0", "val-1", "file-2", "file-3", "file-4"]);
        assert_eq!(items.as_slice()[2].locator(), "/in/a.txt");
        assert_eq!(items.as_slice()[3].locator(), "/in/b.txt");
        assert_eq!(items.as_slice()[4].locator(), "/abs/c.txt");
    }

    #[tokio::test]
    async fn missing_file_is_source_error() {
        let err = StaticItems::load(&[], Some(Path::new("/nonexistent/items")), Path::new("/"))
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "item_source");
    }
}
