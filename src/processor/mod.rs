//! # Units of work.
//!
//! - [`Processor`] async, cancelable, retry-safe capability consumed by pools
//! - [`ProcessorFn`] closure-backed processor
//! - [`ProcessorRef`] shared handle (`Arc<dyn Processor>`)
//! - [`UppercaseFile`] sample file transform used by the run modes

#[allow(clippy::module_inception)]
mod processor;
mod uppercase;

pub use processor::{Processor, ProcessorFn, ProcessorRef};
pub use uppercase::UppercaseFile;
