//! # Work items and where they come from.
//!
//! - [`WorkItem`] the immutable unit handed to a processor
//! - [`StaticItems`] ordered list known before the pool starts
//! - [`WorkQueue`] remote queue drained until exhaustion, with [`RedisQueue`]

mod item;
mod queue;
mod source;

pub use item::WorkItem;
pub use queue::{QueueError, RedisQueue, WorkQueue};
pub use source::StaticItems;
