//! Lifecycle hooks for the generation stream.
//!
//! Observation of the stream is fire-and-forget: the controller emits an
//! event and moves on. Handlers must be cheap and must tolerate rapid,
//! high-frequency partial updates, potentially one per chunk. For state
//! snapshots, prefer the `watch` channel exposed by the streamer; these
//! events exist for logging, progress UI, and side effects.

use std::sync::Arc;

/// Events emitted over the life of one stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The chunk source accepted the request; content will follow.
    Connected,
    /// The document title arrived.
    Title {
        title: String,
    },
    /// A partial reconstruction was merged and published.
    Partial {
        /// The merged state, serialized.
        value: serde_json::Value,
    },
    /// Legacy wire: a named section finished generating.
    SectionCompleted {
        section: String,
    },
    /// The generated document was persisted server-side.
    DocumentSaved {
        document_id: Option<String>,
    },
    /// The stream reached its terminal complete state.
    Completed,
    /// The stream failed; partial state remains visible.
    Errored {
        message: String,
    },
    /// The consumer called `stop()`.
    Stopped,
}

/// Receiver for [`StreamEvent`]s. Entirely optional; the stream works
/// without a handler.
///
/// # Example
///
/// ```
/// use resume_stream::events::{EventHandler, StreamEvent};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: StreamEvent) {
///         if let StreamEvent::Title { title } = event {
///             println!("generating: {title}");
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: StreamEvent);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: StreamEvent) {
    if let Some(h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use resume_stream::events::{FnEventHandler, StreamEvent};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: StreamEvent| {
///     if let StreamEvent::Completed = event {
///         println!("done");
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(StreamEvent) + Send + Sync>(pub F);

impl<F: Fn(StreamEvent) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: StreamEvent) {
        (self.0)(event);
    }
}
