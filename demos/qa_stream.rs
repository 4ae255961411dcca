//! Interview Q&A reconstruction over a scripted stream.
//!
//! The Q&A wire is a sequence of discrete records; this demo mixes bare
//! record payloads with envelope fragments split across events to show the
//! boundary scanner at work.
//!
//! Run with: `cargo run --example qa_stream`

use resume_stream::{QaStreamer, ScriptedChunkSource};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,resume_stream=debug".into()),
        )
        .init();

    let payloads = vec![
        // A complete record delivered in one payload.
        json!({
            "question": "Tell me about a hard production bug you fixed.",
            "answer": "A watch channel kept publishing after cancellation..."
        })
        .to_string(),
        // Keep-alive.
        "{}".to_string(),
        // A record sliced across two content fragments.
        json!({"type": "chunk", "content": "{\"question\": \"Why Rust for this service?\", \"ans"})
            .to_string(),
        json!({"type": "chunk", "content": "wer\": \"Predictable latency and ownership.\"}"})
            .to_string(),
    ];

    let mut streamer = QaStreamer::builder("http://localhost:8080/generate").build();
    let mut updates = streamer.subscribe();
    streamer.start_from(ScriptedChunkSource::events(payloads));

    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        println!(
            "connected={} complete={} | {} pair(s)",
            snapshot.status.is_connected,
            snapshot.status.is_complete,
            snapshot.state.len()
        );
        if snapshot.status.is_terminal() {
            for (i, pair) in snapshot.state.iter().enumerate() {
                println!("Q{}: {}\nA{}: {}", i + 1, pair.question, i + 1, pair.answer);
            }
            break;
        }
    }
    Ok(())
}
