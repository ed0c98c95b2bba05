//! History commands: list and read stored conversations

use anyhow::Result;

use crate::cli::replay::print_message;
use crate::store::TranscriptStore;

pub fn list(store: &TranscriptStore) -> Result<()> {
    let conversations = store.list_conversations()?;

    if conversations.is_empty() {
        println!("No conversations found. Run 'blueprint replay <file> --save' first.");
        return Ok(());
    }

    println!("{:<10} {:<20} {:<8} {}", "ID", "Updated", "Msgs", "Title");
    println!("{}", "-".repeat(80));

    for conversation in conversations {
        let title = conversation
            .title
            .as_ref()
            .map(|t| {
                if t.chars().count() > 40 {
                    format!("{}...", t.chars().take(37).collect::<String>())
                } else {
                    t.clone()
                }
            })
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<10} {:<20} {:<8} {}",
            &conversation.id[..8],
            conversation.updated_at.as_deref().unwrap_or("-"),
            conversation.message_count,
            title
        );
    }

    Ok(())
}

pub fn read(store: &TranscriptStore, query: &str, tools: bool) -> Result<()> {
    let conversation = match store.find_conversation(query)? {
        Some(c) => c,
        None => {
            println!("Conversation '{}' not found.", query);
            return Ok(());
        }
    };

    println!("\n{}", "=".repeat(80));
    println!(
        "Conversation: {} ({})",
        &conversation.id[..8],
        conversation.title.as_deref().unwrap_or("untitled")
    );
    println!("{}", "=".repeat(80));

    let messages = store.load_messages(&conversation.id)?;
    if messages.is_empty() {
        println!("\nNo messages stored.");
        return Ok(());
    }

    for message in &messages {
        print_message(message, tools);
    }

    Ok(())
}
