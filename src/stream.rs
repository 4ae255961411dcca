//! Stream ownership and lifecycle: start, replace, stop.
//!
//! A [`Streamer`] owns at most one live stream at a time. `start` cancels
//! whatever is in flight, resets the published snapshot, and spawns a fresh
//! [`StreamSession`]. State is never shared across streams; the current
//! controller is replaced wholesale on restart.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::events::{self, EventHandler, StreamEvent};
use crate::extractor::{Extract, QaExtractor, ResumeExtractor};
use crate::request::GenerationRequest;
use crate::session::StreamSession;
use crate::source::{ChunkSource, HttpChunkSource};
use crate::status::Snapshot;

/// Streams one résumé / cover-letter record at a time.
pub type ResumeStreamer = Streamer<ResumeExtractor>;
/// Streams one interview Q&A sequence at a time.
pub type QaStreamer = Streamer<QaExtractor>;

/// Owner of one logical stream slot.
///
/// # Example
///
/// ```no_run
/// use resume_stream::request::{DocumentKind, GenerationRequest};
/// use resume_stream::stream::ResumeStreamer;
///
/// # async fn demo() {
/// let mut streamer = ResumeStreamer::builder("https://api.example.com/generate").build();
/// streamer.start(GenerationRequest::new(DocumentKind::Resume, "Job description..."));
///
/// let mut updates = streamer.subscribe();
/// while updates.changed().await.is_ok() {
///     let snapshot = updates.borrow_and_update().clone();
///     println!("profile so far: {}", snapshot.state.profile);
///     if snapshot.status.is_terminal() {
///         break;
///     }
/// }
/// # }
/// ```
pub struct Streamer<X: Extract + Default> {
    client: Client,
    endpoint: String,
    handler: Option<Arc<dyn EventHandler>>,
    publisher: Arc<watch::Sender<Snapshot<X::Output>>>,
    // Keeps the channel open even when no external subscriber exists.
    _keepalive: watch::Receiver<Snapshot<X::Output>>,
    cancel: Option<Arc<AtomicBool>>,
    task: Option<JoinHandle<()>>,
}

impl<X: Extract + Default> Streamer<X> {
    pub fn builder(endpoint: impl Into<String>) -> StreamerBuilder<X> {
        StreamerBuilder {
            endpoint: endpoint.into(),
            client: None,
            timeout: None,
            handler: None,
            _extractor: PhantomData,
        }
    }

    /// Open the generation request and start consuming it. Any prior
    /// in-flight stream is cancelled and its state reset first.
    ///
    /// Connection happens on the spawned task: the published status flips
    /// to connected once the server accepts the request, or to errored if
    /// it refuses.
    pub fn start(&mut self, request: GenerationRequest) {
        self.replace_current();
        let cancel = self.arm();
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let publisher = Arc::clone(&self.publisher);
        let handler = self.handler.clone();

        self.task = Some(tokio::spawn(async move {
            match HttpChunkSource::connect(&client, &endpoint, &request).await {
                Ok(source) => {
                    StreamSession::new(X::default(), publisher, handler, cancel)
                        .run(source)
                        .await;
                }
                Err(err) => {
                    if cancel.load(Ordering::Relaxed) {
                        return;
                    }
                    let mut snapshot = Snapshot::default();
                    snapshot.status.error = Some(err.to_string());
                    publisher.send_replace(snapshot);
                    events::emit(
                        &handler,
                        StreamEvent::Errored {
                            message: err.to_string(),
                        },
                    );
                }
            }
        }));
    }

    /// Drive a stream from an already-open chunk source. Used by tests,
    /// demos, and alternative transports; lifecycle semantics are identical
    /// to [`start`](Self::start).
    pub fn start_from(&mut self, source: impl ChunkSource + 'static) {
        self.replace_current();
        let cancel = self.arm();
        let publisher = Arc::clone(&self.publisher);
        let handler = self.handler.clone();
        self.task = Some(tokio::spawn(async move {
            StreamSession::new(X::default(), publisher, handler, cancel)
                .run(source)
                .await;
        }));
    }

    /// Abort the current stream without erroring.
    ///
    /// The session observes the flag at its next chunk boundary and exits;
    /// aborting the task tears down a read blocked on the transport. The
    /// session's buffer dies with it. Already-published structured state is
    /// left untouched; callers may keep showing partial results.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let mut snapshot = self.publisher.borrow().clone();
        if snapshot.status.is_connected {
            snapshot.status.is_connected = false;
            self.publisher.send_replace(snapshot);
        }
        events::emit(&self.handler, StreamEvent::Stopped);
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot<X::Output> {
        self.publisher.borrow().clone()
    }

    /// Subscribe to snapshot updates. `watch` semantics: receivers always
    /// see the latest value and skip intermediate ones they were too slow
    /// for.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<X::Output>> {
        self.publisher.subscribe()
    }

    pub fn document_id(&self) -> Option<String> {
        self.publisher.borrow().document_id.clone()
    }

    pub fn title(&self) -> Option<String> {
        self.publisher.borrow().title.clone()
    }

    /// Whether a stream task is currently running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn replace_current(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.publisher.send_replace(Snapshot::default());
    }

    fn arm(&mut self) -> Arc<AtomicBool> {
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Some(Arc::clone(&cancel));
        cancel
    }
}

impl<X: Extract + Default> Drop for Streamer<X> {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<X: Extract + Default> std::fmt::Debug for Streamer<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Streamer")
            .field("endpoint", &self.endpoint)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Builder for [`Streamer`].
pub struct StreamerBuilder<X: Extract + Default> {
    endpoint: String,
    client: Option<Client>,
    timeout: Option<Duration>,
    handler: Option<Arc<dyn EventHandler>>,
    _extractor: PhantomData<X>,
}

impl<X: Extract + Default> StreamerBuilder<X> {
    /// Use a custom HTTP client. When set, `timeout` is ignored; the
    /// client's own configuration applies.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Total request timeout. Unset by default: generation streams are
    /// long-lived, so only the connect phase is bounded.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> Streamer<X> {
        let client = self.client.unwrap_or_else(|| {
            let mut builder = Client::builder().connect_timeout(Duration::from_secs(30));
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            builder.build().expect("Failed to build HTTP client")
        });
        let (publisher, keepalive) = watch::channel(Snapshot::default());
        Streamer {
            client,
            endpoint: self.endpoint,
            handler: self.handler,
            publisher: Arc::new(publisher),
            _keepalive: keepalive,
            cancel: None,
            task: None,
        }
    }
}
