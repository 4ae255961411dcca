//! # resume-stream
//!
//! Incremental JSON reconstruction for streamed AI document generation.
//!
//! A language model writes a résumé, cover letter, or interview Q&A set
//! token by token; the server pushes those tokens over a long-lived SSE
//! response. At any instant the accumulated text is usually *invalid* JSON
//! (a brace short, or a value cut off mid-string), yet the UI must keep
//! showing whatever is safely extractable. This crate owns that
//! problem: buffering, sanitizing, repairing, boundary scanning, and state
//! reconciliation, plus the stream lifecycle around it (connect, emit,
//! error, complete, cancel).
//!
//! ## Core Concepts
//!
//! - **[`Streamer`]**: owns one stream slot with `start` / `stop` /
//!   `subscribe`. Aliased as [`ResumeStreamer`] and [`QaStreamer`].
//! - **[`StreamSession`]**: the consumption loop behind a streamer. It
//!   dispatches decoded wire events, maintains [`StreamStatus`], publishes
//!   [`Snapshot`]s through a `watch` channel.
//! - **[`Extract`]**: the target-shape parameterization.
//!   [`ResumeExtractor`] reconciles one evolving [`ResumeDraft`];
//!   [`QaExtractor`] grows a list of complete [`QaPair`]s.
//! - **[`parse_fragment`]**: strict parse, then structural completion,
//!   then (at end of stream) full [`repair_json`].
//! - **[`scan`]**: quote-aware boundary scanning over a buffer of
//!   concatenated records.
//!
//! ## Quick Start
//!
//! ```no_run
//! use resume_stream::{DocumentKind, GenerationRequest, ResumeStreamer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut streamer = ResumeStreamer::builder("https://api.example.com/generate").build();
//!     streamer.start(GenerationRequest::new(
//!         DocumentKind::Resume,
//!         "Senior Rust engineer, distributed systems...",
//!     ));
//!
//!     let mut updates = streamer.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let snapshot = updates.borrow_and_update().clone();
//!         println!(
//!             "profile: {} chars, {} experience entries",
//!             snapshot.state.profile.len(),
//!             snapshot.state.work_experience.len()
//!         );
//!         if snapshot.status.is_terminal() {
//!             break;
//!         }
//!     }
//! }
//! ```
//!
//! Partial results stay visible after an error or a manual stop; a
//! half-generated résumé is still useful to the person watching it render.

pub mod boundary;
pub mod error;
pub mod events;
pub mod extractor;
pub mod fragment;
pub mod repair;
pub mod request;
pub mod resume;
pub mod sanitize;
pub mod session;
pub mod source;
pub mod sse;
pub mod status;
pub mod stream;
pub mod wire;

pub use boundary::{drain_complete, scan, QaPair, ScanOutcome};
pub use error::{Result, StreamError};
pub use events::{EventHandler, FnEventHandler, StreamEvent};
pub use extractor::{Extract, QaExtractor, ResumeExtractor};
pub use fragment::{parse_fragment, FragmentError};
pub use repair::repair_json;
pub use request::{DocumentKind, GenerationRequest};
pub use resume::{
    reconcile, CertificationEntry, EducationEntry, ExperienceEntry, ProjectEntry, ResumeDraft,
};
pub use sanitize::sanitize;
pub use session::StreamSession;
pub use source::{ChunkSource, HttpChunkSource, ScriptedChunkSource};
pub use sse::{SseDecoder, SseFrame};
pub use status::{Snapshot, StreamStatus};
pub use stream::{QaStreamer, ResumeStreamer, Streamer, StreamerBuilder};
pub use wire::{TaggedEvent, WireEvent};
