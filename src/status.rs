//! Stream status and the published snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Connection and completion state of one stream.
///
/// Lifecycle: at rest both flags are false. `is_connected` turns true once
/// the chunk source accepts the request. The terminal state is exactly one
/// of `is_complete == true` or `error != None`, and both imply
/// `is_connected == false`. A deliberate `stop()` clears `is_connected`
/// without setting either.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub is_connected: bool,
    pub is_complete: bool,
    pub error: Option<String>,
    /// Sections reported finished by legacy `sectionCompleted` events.
    pub completed_sections: BTreeSet<String>,
}

impl StreamStatus {
    /// True once the stream has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.is_complete || self.error.is_some()
    }
}

/// One published view of the stream: the reconstructed state plus status
/// and server-assigned identifiers. Observers receive these through a
/// `watch` channel and coalesce on their own schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot<T> {
    pub state: T,
    pub status: StreamStatus,
    pub document_id: Option<String>,
    pub title: Option<String>,
}
