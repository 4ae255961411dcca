//! SSE line framing for the generation stream.
//!
//! Buffers raw transport chunks, splits on newline boundaries, and yields
//! one frame per complete `data:` line. `[DONE]` marks the end of the
//! logical stream (distinct from the transport's own end-of-body) and is
//! surfaced as an explicit frame so the controller can run its final
//! extraction pass. `event:` lines, comment lines, and blank keep-alive
//! lines are dropped here.

/// One decoded SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// The payload of one `data:` line, JSON still undecoded.
    Payload(String),
    /// The `[DONE]` terminator.
    Done,
}

/// Buffered SSE decoder. Handles `data:` lines split across TCP chunk
/// boundaries.
///
/// # Example
///
/// ```
/// use resume_stream::sse::{SseDecoder, SseFrame};
///
/// let mut decoder = SseDecoder::new();
/// let frames = decoder.decode(b"data: {\"type\":\"chunk\"}\n\ndata: [DONE]\n\n");
/// assert_eq!(frames.len(), 2);
/// assert_eq!(frames[1], SseFrame::Done);
/// ```
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    /// Create a new empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every frame completed by this chunk.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let text = String::from_utf8_lossy(chunk);
        self.buffer.push_str(&text);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(frame) = frame_from_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Drain whatever is left after the transport closed. A final `data:`
    /// line without a trailing newline is still a complete record at
    /// end-of-body.
    pub fn flush(&mut self) -> Vec<SseFrame> {
        let remaining = std::mem::take(&mut self.buffer);
        remaining.lines().filter_map(frame_from_line).collect()
    }
}

fn frame_from_line(line: &str) -> Option<SseFrame> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("event:") || line.starts_with(':') {
        return None;
    }
    let data = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))?
        .trim();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(SseFrame::Done);
    }
    Some(SseFrame::Payload(data.to_string()))
}
