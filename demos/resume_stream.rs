//! Résumé reconstruction over a scripted stream.
//!
//! Replays a canned SSE exchange (content deltas cut at awkward places,
//! then an authoritative completion) and prints each published snapshot.
//!
//! Run with: `cargo run --example resume_stream`

use resume_stream::{ResumeStreamer, ScriptedChunkSource};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,resume_stream=debug".into()),
        )
        .init();

    let authoritative = json!({
        "profile": "Senior Rust engineer with a focus on streaming systems.",
        "workExperience": [
            {"company": "Acme", "role": "Staff Engineer", "period": "2021–2025"}
        ],
        "hardSkills": ["Rust", "Tokio", "PostgreSQL"],
        "softSkills": ["Mentoring"],
        "name": "Ada Lovelace",
        "email": "ada@example.com"
    });

    // Content deltas sliced mid-token, the way a model actually streams.
    let payloads = vec![
        json!({"type": "chunk", "title": "Senior Rust Engineer — Acme"}).to_string(),
        json!({"type": "chunk", "content": "{\"profile\": \"Senior Rust eng"}).to_string(),
        json!({"type": "chunk", "content": "ineer\", \"hardSkills\": [\"Rust\""}).to_string(),
        json!({"type": "chunk", "content": ", \"Tokio\"]}"}).to_string(),
        json!({
            "type": "generationComplete",
            "documentId": "doc-123",
            "content": authoritative.to_string()
        })
        .to_string(),
    ];

    let mut streamer = ResumeStreamer::builder("http://localhost:8080/generate").build();
    let mut updates = streamer.subscribe();
    streamer.start_from(ScriptedChunkSource::events(payloads));

    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        println!(
            "connected={} complete={} | title={:?} | profile={:?} | skills={:?}",
            snapshot.status.is_connected,
            snapshot.status.is_complete,
            snapshot.title,
            snapshot.state.profile,
            snapshot.state.hard_skills,
        );
        if snapshot.status.is_terminal() {
            println!(
                "final document id: {:?}, {} experience entries",
                snapshot.document_id,
                snapshot.state.work_experience.len()
            );
            break;
        }
    }
    Ok(())
}
