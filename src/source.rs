//! The chunk-source collaborator boundary.
//!
//! The transport that opens the long-lived request is external to the
//! reconstruction core; all the core needs is an ordered sequence of opaque
//! byte fragments and a terminal end signal. [`ChunkSource`] is that
//! contract, [`HttpChunkSource`] the production implementation over
//! `reqwest`, and [`ScriptedChunkSource`] a deterministic stand-in for
//! tests and demos.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use std::collections::VecDeque;

use crate::error::{Result, StreamError};
use crate::request::GenerationRequest;

/// Ordered byte fragments terminated by an explicit end-of-body.
///
/// `Ok(None)` is the transport's end signal; after it, no further chunks
/// are yielded. Implementations are read by exactly one consumption loop
/// at a time.
#[async_trait]
pub trait ChunkSource: Send {
    /// Wait for the next fragment. `Ok(None)` means the body has ended.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

type ByteStream = BoxStream<'static, reqwest::Result<Vec<u8>>>;

/// Production chunk source: a `POST` with the generation request as JSON
/// body, consumed as a byte stream.
pub struct HttpChunkSource {
    inner: ByteStream,
}

impl HttpChunkSource {
    /// Open the long-lived request. Returns once the server has accepted
    /// it, which is the point where the stream counts as connected. A
    /// non-success status is reported with its body text.
    pub async fn connect(
        client: &Client,
        url: &str,
        request: &GenerationRequest,
    ) -> Result<Self> {
        let response = client.post(url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Http { status, body });
        }

        let inner = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Ok(Self { inner })
    }
}

#[async_trait]
impl ChunkSource for HttpChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.inner.next().await {
            Some(Ok(bytes)) => Ok(Some(bytes)),
            Some(Err(err)) => Err(StreamError::Request(err)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for HttpChunkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChunkSource").finish_non_exhaustive()
    }
}

/// Canned chunk source for deterministic tests and demos.
///
/// Yields the configured chunks in order, then either ends cleanly, fails
/// with a configured message, or hangs until cancelled.
#[derive(Debug, Default)]
pub struct ScriptedChunkSource {
    chunks: VecDeque<Vec<u8>>,
    fail_with: Option<String>,
    hang_at_end: bool,
}

impl ScriptedChunkSource {
    /// Chunks delivered verbatim, in order.
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| c.into().into_bytes()).collect(),
            fail_with: None,
            hang_at_end: false,
        }
    }

    /// Wrap each payload in a `data:` line and append the `[DONE]`
    /// terminator, mimicking a well-behaved server.
    pub fn events<I, S>(payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chunks: Vec<String> = payloads
            .into_iter()
            .map(|p| format!("data: {}\n\n", p.into()))
            .collect();
        chunks.push("data: [DONE]\n\n".to_string());
        Self::new(chunks)
    }

    /// Fail with a transport error after the scripted chunks are exhausted.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Never end: once the scripted chunks are exhausted, block until the
    /// consumer is cancelled. Lets tests exercise `stop()` on a live
    /// stream.
    pub fn then_hang(mut self) -> Self {
        self.hang_at_end = true;
        self
    }
}

#[async_trait]
impl ChunkSource for ScriptedChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(Some(chunk));
        }
        if let Some(message) = self.fail_with.take() {
            return Err(StreamError::Other(message));
        }
        if self.hang_at_end {
            futures::future::pending::<()>().await;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_yields_in_order_then_ends() {
        let mut source = ScriptedChunkSource::new(["one", "two"]);
        assert_eq!(source.next_chunk().await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(source.next_chunk().await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(source.next_chunk().await.unwrap(), None);
        assert_eq!(source.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn scripted_events_wrap_and_terminate() {
        let mut source = ScriptedChunkSource::events([r#"{"x":1}"#]);
        let first = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(first, b"data: {\"x\":1}\n\n".to_vec());
        let second = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(second, b"data: [DONE]\n\n".to_vec());
        assert_eq!(source.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn scripted_failure_fires_once_after_chunks() {
        let mut source = ScriptedChunkSource::new(["chunk"]).failing_with("boom");
        assert!(source.next_chunk().await.unwrap().is_some());
        match source.next_chunk().await {
            Err(StreamError::Other(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(source.next_chunk().await.unwrap(), None);
    }
}
