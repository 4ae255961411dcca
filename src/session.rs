//! The stream controller: one sequential consumption loop per stream.
//!
//! A session owns the SSE decoder, the extractor, and the status for
//! exactly one stream. Chunks are processed strictly in arrival order;
//! every publish goes through a `watch` channel so observers always see the
//! latest snapshot and coalesce on their own schedule. Cancellation is
//! cooperative: the abort flag is observed at the next chunk boundary, and
//! nothing is published after it is set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::events::{self, EventHandler, StreamEvent};
use crate::extractor::Extract;
use crate::source::ChunkSource;
use crate::sse::{SseDecoder, SseFrame};
use crate::status::{Snapshot, StreamStatus};
use crate::wire::{TaggedEvent, WireEvent};

/// Controller for one stream instance.
///
/// Create with a fresh extractor and a `watch` sender, then [`run`] it to
/// completion on a connected [`ChunkSource`]. All failure handling is
/// local: nothing escapes as a panic or error return; outcomes land in
/// [`StreamStatus`] on the published snapshot.
///
/// [`run`]: StreamSession::run
pub struct StreamSession<X: Extract> {
    decoder: SseDecoder,
    extractor: X,
    status: StreamStatus,
    document_id: Option<String>,
    title: Option<String>,
    publisher: Arc<watch::Sender<Snapshot<X::Output>>>,
    handler: Option<Arc<dyn EventHandler>>,
    cancel: Arc<AtomicBool>,
    saw_done: bool,
}

impl<X: Extract> StreamSession<X> {
    pub fn new(
        extractor: X,
        publisher: Arc<watch::Sender<Snapshot<X::Output>>>,
        handler: Option<Arc<dyn EventHandler>>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            decoder: SseDecoder::new(),
            extractor,
            status: StreamStatus::default(),
            document_id: None,
            title: None,
            publisher,
            handler,
            cancel,
            saw_done: false,
        }
    }

    /// Consume the source until a terminal state, cancellation, or
    /// end-of-body.
    pub async fn run<S: ChunkSource>(mut self, mut source: S) {
        self.status.is_connected = true;
        self.publish();
        self.emit(StreamEvent::Connected);

        loop {
            if self.cancelled() {
                return;
            }
            let chunk = match source.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) => {
                    // A read torn down by a deliberate stop is not an error.
                    if self.cancelled() {
                        return;
                    }
                    self.fail(err.to_string());
                    return;
                }
            };
            for frame in self.decoder.decode(&chunk) {
                if self.saw_done {
                    break;
                }
                match frame {
                    SseFrame::Payload(payload) => self.dispatch(&payload),
                    SseFrame::Done => self.saw_done = true,
                }
                if self.status.is_terminal() {
                    return;
                }
            }
            if self.saw_done {
                break;
            }
        }

        if !self.saw_done {
            for frame in self.decoder.flush() {
                if let SseFrame::Payload(payload) = frame {
                    self.dispatch(&payload);
                }
                if self.status.is_terminal() {
                    return;
                }
            }
        }
        if self.cancelled() {
            return;
        }
        self.finish_stream();
    }

    /// Clean end-of-stream without a terminal completion event: one last
    /// final-pass extraction over whatever remains, then complete.
    fn finish_stream(&mut self) {
        match self.extractor.finish() {
            Ok(_) => {}
            Err(err) => debug!(%err, "final extraction failed; keeping last published state"),
        }
        self.status.is_complete = true;
        self.status.is_connected = false;
        self.publish();
        self.emit(StreamEvent::Completed);
    }

    fn dispatch(&mut self, payload: &str) {
        let event = match WireEvent::decode(payload) {
            Ok(event) => event,
            Err(err) => {
                // One malformed control frame must not sacrifice the stream.
                warn!(%err, "skipping undecodable event payload");
                return;
            }
        };
        match event {
            WireEvent::Tagged(tagged) => self.dispatch_tagged(tagged),
            WireEvent::Qa(_) => {
                if self.extractor.ingest_record(payload) {
                    self.publish();
                    self.emit_partial();
                } else {
                    debug!("bare record payload not consumed by this extractor");
                }
            }
            WireEvent::LegacyError { error, message } => self.fail(message.unwrap_or(error)),
            WireEvent::Ignored(value) => {
                if value.as_object().is_some_and(|map| map.is_empty()) {
                    trace!("keep-alive");
                } else {
                    debug!(%value, "ignoring unrecognized event payload");
                }
            }
        }
    }

    fn dispatch_tagged(&mut self, event: TaggedEvent) {
        match event {
            TaggedEvent::Chunk { title, content } => {
                if let Some(title) = title {
                    self.title = Some(title.clone());
                    self.publish();
                    self.emit(StreamEvent::Title { title });
                }
                if let Some(content) = content {
                    self.ingest_content(&content);
                }
            }
            TaggedEvent::GenerationComplete {
                document_id,
                content,
            } => self.complete_with(document_id, &content),
            TaggedEvent::Error { message, error } => {
                self.fail(
                    message
                        .or(error)
                        .unwrap_or_else(|| "generation failed".to_string()),
                );
            }
            TaggedEvent::SectionStarted { section } => {
                debug!(?section, "section started");
            }
            TaggedEvent::SectionContent { content, .. } => {
                if let Some(content) = content {
                    self.ingest_content(&content);
                }
            }
            TaggedEvent::SectionCompleted { section, content } => {
                if let Some(content) = content {
                    self.ingest_content(&content);
                }
                if let Some(section) = section {
                    self.status.completed_sections.insert(section.clone());
                    self.publish();
                    self.emit(StreamEvent::SectionCompleted { section });
                }
            }
            TaggedEvent::DocumentSaved { document_id, title } => {
                if document_id.is_some() {
                    self.document_id = document_id;
                }
                if title.is_some() {
                    self.title = title;
                }
                self.publish();
                self.emit(StreamEvent::DocumentSaved {
                    document_id: self.document_id.clone(),
                });
            }
            TaggedEvent::SectionError { section, message } => {
                self.fail(message.unwrap_or_else(|| {
                    format!("section {} failed", section.unwrap_or_default())
                }));
            }
            TaggedEvent::Unknown => {
                debug!("ignoring unrecognized event tag");
            }
        }
    }

    /// A content delta arrived: extract and publish if state advanced.
    /// A not-yet-parseable buffer is the normal mid-stream condition.
    fn ingest_content(&mut self, content: &str) {
        match self.extractor.ingest(content) {
            Ok(true) => {
                self.publish();
                self.emit_partial();
            }
            Ok(false) => {}
            Err(err) => debug!(%err, "fragment extraction failed mid-stream"),
        }
    }

    /// Terminal completion: the authoritative payload replaces all
    /// reconciled state. If it cannot be parsed even with repair, that is a
    /// hard error; partial state stays visible but is non-authoritative.
    fn complete_with(&mut self, document_id: Option<String>, content: &str) {
        match self.extractor.adopt(content) {
            Ok(()) => {
                if document_id.is_some() {
                    self.document_id = document_id;
                }
                self.status.is_complete = true;
                self.status.is_connected = false;
                self.publish();
                self.emit(StreamEvent::Completed);
            }
            Err(err) => self.fail(format!("authoritative payload could not be parsed: {err}")),
        }
    }

    fn fail(&mut self, message: String) {
        warn!(%message, "stream errored");
        self.status.error = Some(message.clone());
        self.status.is_connected = false;
        self.publish();
        self.emit(StreamEvent::Errored { message });
    }

    fn publish(&self) {
        // A post-cancellation write is a defect: the replacing stream owns
        // the channel now.
        if self.cancelled() {
            return;
        }
        self.publisher.send_replace(Snapshot {
            state: self.extractor.snapshot(),
            status: self.status.clone(),
            document_id: self.document_id.clone(),
            title: self.title.clone(),
        });
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn emit(&self, event: StreamEvent) {
        events::emit(&self.handler, event);
    }

    fn emit_partial(&self) {
        if self.handler.is_some() {
            let value = serde_json::to_value(self.extractor.snapshot()).unwrap_or(Value::Null);
            self.emit(StreamEvent::Partial { value });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{QaExtractor, ResumeExtractor};
    use crate::resume::ResumeDraft;
    use crate::source::ScriptedChunkSource;
    use serde_json::json;

    fn resume_session() -> (
        StreamSession<ResumeExtractor>,
        watch::Receiver<Snapshot<ResumeDraft>>,
    ) {
        let (tx, rx) = watch::channel(Snapshot::default());
        let session = StreamSession::new(
            ResumeExtractor::new(),
            Arc::new(tx),
            None,
            Arc::new(AtomicBool::new(false)),
        );
        (session, rx)
    }

    fn qa_session() -> (
        StreamSession<QaExtractor>,
        watch::Receiver<Snapshot<Vec<crate::boundary::QaPair>>>,
    ) {
        let (tx, rx) = watch::channel(Snapshot::default());
        let session = StreamSession::new(
            QaExtractor::new(),
            Arc::new(tx),
            None,
            Arc::new(AtomicBool::new(false)),
        );
        (session, rx)
    }

    #[tokio::test]
    async fn two_chunk_scenario_with_done() {
        let (session, mut rx) = resume_session();
        let source = ScriptedChunkSource::events([
            json!({"type": "chunk", "content": r#"{"profile":"Sr "#}).to_string(),
            json!({"type": "chunk", "content": r#"Eng","workExperience":[]}"#}).to_string(),
        ]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "Sr Eng");
        assert!(snap.state.work_experience.is_empty());
        assert!(snap.status.is_complete);
        assert!(!snap.status.is_connected);
        assert!(snap.status.error.is_none());
    }

    #[tokio::test]
    async fn title_recorded_without_state_change() {
        let (session, mut rx) = resume_session();
        let source = ScriptedChunkSource::events([
            json!({"type": "chunk", "title": "Backend Engineer"}).to_string(),
        ]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.title.as_deref(), Some("Backend Engineer"));
        assert_eq!(snap.state, ResumeDraft::default());
        assert!(snap.status.is_complete);
    }

    #[tokio::test]
    async fn completion_supersedes_partial_state() {
        let (session, mut rx) = resume_session();
        let partial = json!({"type": "chunk", "content":
            r#"{"profile":"mid-stream","projects":[{"name":"stale"}]}"#});
        let authoritative = json!({
            "profile": "authoritative",
            "hardSkills": ["Rust"],
            "name": "Ada"
        });
        let complete = json!({
            "type": "generationComplete",
            "documentId": "doc-42",
            "content": authoritative.to_string()
        });
        let source = ScriptedChunkSource::events([partial.to_string(), complete.to_string()]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "authoritative");
        assert_eq!(snap.state.hard_skills, vec!["Rust"]);
        assert!(snap.state.projects.is_empty(), "partial state survived");
        assert_eq!(snap.document_id.as_deref(), Some("doc-42"));
        assert!(snap.status.is_complete);
        assert!(!snap.status.is_connected);
    }

    #[tokio::test]
    async fn bad_authoritative_payload_is_hard_error_keeping_partial() {
        let (session, mut rx) = resume_session();
        let partial = json!({"type": "chunk", "content": r#"{"profile":"kept"}"#});
        let complete = json!({"type": "generationComplete", "content": "][ not json"});
        let source = ScriptedChunkSource::events([partial.to_string(), complete.to_string()]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "kept");
        assert!(snap.status.error.is_some());
        assert!(!snap.status.is_complete);
        assert!(!snap.status.is_connected);
    }

    #[tokio::test]
    async fn error_event_keeps_partial_state() {
        let (session, mut rx) = resume_session();
        let source = ScriptedChunkSource::events([
            json!({"type": "chunk", "content": r#"{"profile":"partial"}"#}).to_string(),
            json!({"type": "error", "message": "model unavailable"}).to_string(),
        ]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "partial");
        assert_eq!(snap.status.error.as_deref(), Some("model unavailable"));
        assert!(!snap.status.is_connected);
        assert!(!snap.status.is_complete);
    }

    #[tokio::test]
    async fn malformed_control_frame_skipped() {
        let (session, mut rx) = resume_session();
        let source = ScriptedChunkSource::new([
            "data: {not valid json}\n\n".to_string(),
            format!(
                "data: {}\n\n",
                json!({"type": "chunk", "content": r#"{"profile":"ok"}"#})
            ),
            "data: [DONE]\n\n".to_string(),
        ]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "ok");
        assert!(snap.status.error.is_none());
        assert!(snap.status.is_complete);
    }

    #[tokio::test]
    async fn keep_alive_and_unknown_tags_ignored() {
        let (session, mut rx) = resume_session();
        let source = ScriptedChunkSource::events([
            "{}".to_string(),
            json!({"type": "sectionPing"}).to_string(),
            json!({"type": "chunk", "content": r#"{"profile":"ok"}"#}).to_string(),
        ]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "ok");
        assert!(snap.status.is_complete);
        assert!(snap.status.error.is_none());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_error() {
        let (session, mut rx) = resume_session();
        let source = ScriptedChunkSource::new([format!(
            "data: {}\n\n",
            json!({"type": "chunk", "content": r#"{"profile":"partial"}"#})
        )])
        .failing_with("connection reset");
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "partial");
        assert_eq!(snap.status.error.as_deref(), Some("connection reset"));
        assert!(!snap.status.is_connected);
    }

    #[tokio::test]
    async fn clean_eof_without_done_still_completes() {
        let (session, mut rx) = resume_session();
        // Transport ends mid-document, no [DONE], no completion event: the
        // final repair pass recovers the open string.
        let source = ScriptedChunkSource::new([format!(
            "data: {}\n\n",
            json!({"type": "chunk", "content": r#"{"profile": "Hello"#})
        )]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "Hello");
        assert!(snap.status.is_complete);
        assert!(snap.status.error.is_none());
    }

    #[tokio::test]
    async fn legacy_section_events_reconcile_and_record() {
        let (session, mut rx) = resume_session();
        let source = ScriptedChunkSource::events([
            json!({"type": "sectionStarted", "section": "profile"}).to_string(),
            json!({"type": "sectionContent", "section": "profile",
                   "content": r#"{"profile":"from legacy wire"}"#})
            .to_string(),
            json!({"type": "sectionCompleted", "section": "profile"}).to_string(),
            json!({"type": "documentSaved", "documentId": "legacy-9"}).to_string(),
        ]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "from legacy wire");
        assert!(snap.status.completed_sections.contains("profile"));
        assert_eq!(snap.document_id.as_deref(), Some("legacy-9"));
        assert!(snap.status.is_complete);
    }

    #[tokio::test]
    async fn qa_pairs_from_bare_records_and_slices() {
        let (session, mut rx) = qa_session();
        let source = ScriptedChunkSource::events([
            json!({"question": "Q1", "answer": "A1"}).to_string(),
            json!({"type": "chunk", "content": r#"{"question":"Q2","ans"#}).to_string(),
            json!({"type": "chunk", "content": r#"wer":"A2"}"#}).to_string(),
        ]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.len(), 2);
        assert_eq!(snap.state[0].question, "Q1");
        assert_eq!(snap.state[1].answer, "A2");
        assert!(snap.status.is_complete);
    }

    #[tokio::test]
    async fn cancellation_stops_processing_and_publishing() {
        let (tx, mut rx) = watch::channel(Snapshot::<ResumeDraft>::default());
        let cancel = Arc::new(AtomicBool::new(false));
        cancel.store(true, Ordering::Relaxed);
        let session = StreamSession::new(
            ResumeExtractor::new(),
            Arc::new(tx),
            None,
            Arc::clone(&cancel),
        );
        let source = ScriptedChunkSource::events([
            json!({"type": "chunk", "content": r#"{"profile":"never seen"}"#}).to_string(),
        ]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        // Cancelled before the first read: nothing was published.
        assert_eq!(snap.state, ResumeDraft::default());
        assert!(!snap.status.is_complete);
        assert!(snap.status.error.is_none());
    }

    #[tokio::test]
    async fn content_after_done_is_ignored() {
        let (session, mut rx) = resume_session();
        let source = ScriptedChunkSource::new([format!(
            "data: {}\n\ndata: [DONE]\n\ndata: {}\n\n",
            json!({"type": "chunk", "content": r#"{"profile":"before"}"#}),
            json!({"type": "chunk", "content": r#"{"profile":"after"}"#}),
        )]);
        session.run(source).await;

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.profile, "before");
        assert!(snap.status.is_complete);
    }
}
