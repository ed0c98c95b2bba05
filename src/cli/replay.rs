//! Replay command implementation
//!
//! Feeds a recorded stream (one JSON frame per line) through a chat session
//! and prints the assembled transcript.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::chat::{
    ChatSession, FrameOutcome, Message, RecordingTransport, Role, Segment, SessionOptions,
};
use crate::store::TranscriptStore;

pub struct ReplayOptions<'a> {
    pub initial: Option<String>,
    pub save: Option<(&'a TranscriptStore, Option<String>)>,
    pub tools: bool,
}

/// Result of pushing a recorded stream through a session
#[derive(Debug)]
pub struct Replay {
    pub transcript: Vec<Message>,
    /// Assistant turn still open when the stream ended
    pub partial: Option<Message>,
    pub frames_sent: Vec<String>,
    pub dropped: usize,
    pub last_error: Option<String>,
}

pub fn assemble(path: &Path, session_options: SessionOptions, initial: Option<String>) -> Result<Replay> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut session = ChatSession::new(RecordingTransport::default(), session_options);
    if let Some(initial) = initial {
        session.set_initial_message(initial);
    }
    let url = session.connect("replay")?;
    tracing::info!(%url, "replaying recorded stream");
    session.on_open();

    let mut dropped = 0usize;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if session.on_frame(&line)? == FrameOutcome::Dropped {
            tracing::debug!(line = line_number + 1, "frame dropped");
            dropped += 1;
        }
    }

    let partial = session.assembler().current().cloned();
    let last_error = session.last_error().map(str::to_string);
    session.teardown();

    Ok(Replay {
        transcript: session.assembler().transcript().to_vec(),
        partial,
        frames_sent: session.transport().sent.clone(),
        dropped,
        last_error,
    })
}

pub fn run(path: &Path, session_options: SessionOptions, options: ReplayOptions) -> Result<()> {
    let replay = assemble(path, session_options, options.initial)?;

    if let Some(error) = &replay.last_error {
        println!("⚠️  Session error: {}", error);
    }

    for message in &replay.transcript {
        print_message(message, options.tools);
    }
    if let Some(partial) = &replay.partial {
        println!("\n[incomplete assistant turn]");
        print_message(partial, options.tools);
    }

    println!(
        "\n{} messages, {} frames sent, {} frames dropped",
        replay.transcript.len(),
        replay.frames_sent.len(),
        replay.dropped
    );

    if let Some((store, title)) = options.save {
        let id = store.create_conversation(title.as_deref())?;
        store.append_messages(&id, &replay.transcript)?;
        println!("✅ Saved as conversation {}", &id[..8]);
    }

    Ok(())
}

pub fn print_message(message: &Message, tools: bool) {
    let label = match message.role {
        Role::User => "USER",
        Role::Assistant => "ASSISTANT",
    };
    println!("\n[{}] ({})", label, message.created_at.format("%Y-%m-%d %H:%M:%S"));

    for segment in &message.segments {
        match segment {
            Segment::Text { content } => println!("{}", content),
            Segment::Tool { execution } => {
                println!("  🔧 [Tool: {}] {}", execution.tool, execution.status.as_str());
                if tools {
                    println!("     args: {}", execution.arguments);
                    if let Some(result) = &execution.result {
                        println!("     result: {}", result);
                    }
                    if let Some(error) = &execution.error {
                        println!("     error: {}", error);
                    }
                }
            }
        }
    }
    println!("{}", "-".repeat(40));
}
