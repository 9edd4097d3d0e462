//! # Processor abstraction and function-backed implementation.
//!
//! This module defines the [`Processor`] trait (async, cancelable, retry-safe)
//! and a closure-backed implementation [`ProcessorFn`]. The shared handle type
//! is [`ProcessorRef`], an `Arc<dyn Processor>` suitable for sharing across workers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ProcessError;
use crate::items::WorkItem;

/// Shared handle to a processor.
pub type ProcessorRef = Arc<dyn Processor>;

/// # Unit-of-work capability.
///
/// A processor is invoked once per attempt, so it **must** be safe to call
/// several times for the same item. It should check `token` and return
/// [`ProcessError::Canceled`] promptly when the run is shutting down.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use jobvisor::{ProcessError, Processor, WorkItem};
///
/// struct Touch;
///
/// #[async_trait]
/// impl Processor for Touch {
///     async fn process(&self, item: &WorkItem, token: &CancellationToken) -> Result<(), ProcessError> {
///         if token.is_cancelled() {
///             return Err(ProcessError::Canceled);
///         }
///         let _ = item.locator();
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Processes one item (one attempt).
    async fn process(&self, item: &WorkItem, token: &CancellationToken)
    -> Result<(), ProcessError>;
}

/// Closure-backed processor.
///
/// Wraps `F: Fn(WorkItem, CancellationToken) -> Fut`, producing a fresh future
/// per attempt. Shared state across attempts must be explicit (`Arc<...>`).
///
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use jobvisor::{ProcessError, ProcessorFn, ProcessorRef, WorkItem};
///
/// let p: ProcessorRef = ProcessorFn::arc(|item: WorkItem, _token: CancellationToken| async move {
///     let _ = item.id();
///     Ok::<_, ProcessError>(())
/// });
/// ```
pub struct ProcessorFn<F> {
    f: F,
}

impl<F> ProcessorFn<F> {
    /// Creates a new function-backed processor.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the processor and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Processor for ProcessorFn<F>
where
    F: Fn(WorkItem, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
{
    async fn process(
        &self,
        item: &WorkItem,
        token: &CancellationToken,
    ) -> Result<(), ProcessError> {
        (self.f)(item.clone(), token.clone()).await
    }
}
