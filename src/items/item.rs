//! # WorkItem: one unit of input handed to a processor.

use std::fmt;

/// An immutable unit of work.
///
/// - `id` is stable and human-readable (`val-0`, `file-3`, `07`, or a queue payload stem).
/// - `locator` is opaque to the runtime (a path, a payload) and is only read by the
///   [`Processor`](crate::Processor).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkItem {
    id: String,
    locator: String,
}

impl WorkItem {
    /// Creates an item from an id and a locator.
    pub fn new(id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
        }
    }

    /// Builds an item from a raw queue payload.
    ///
    /// The id is the last `/`-separated segment with a trailing `.txt` removed;
    /// the locator is the payload itself.
    ///
    /// ```
    /// use jobvisor::WorkItem;
    ///
    /// let item = WorkItem::from_payload("/data/in/input-07.txt");
    /// assert_eq!(item.id(), "input-07");
    /// assert_eq!(item.locator(), "/data/in/input-07.txt");
    /// ```
    pub fn from_payload(payload: impl Into<String>) -> Self {
        let locator = payload.into();
        let last = locator.rsplit('/').next().unwrap_or(&locator);
        let id = last.strip_suffix(".txt").unwrap_or(last).to_string();
        Self { id, locator }
    }

    /// Stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Opaque reference passed to the processor.
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.locator)
    }
}
