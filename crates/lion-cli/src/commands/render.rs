use anyhow::{Context, Result};
use console::style;
use lion_core::persist::load_messages;
use std::path::Path;

pub fn execute(file: &Path) -> Result<()> {
    let messages = load_messages(file)
        .with_context(|| format!("Failed to load messages from {}", file.display()))?;
    tracing::debug!("Loaded {} messages from {}", messages.len(), file.display());

    for message in &messages {
        match message.try_chat_msg() {
            Ok(chat) => println!("{}", serde_json::to_string_pretty(&chat)?),
            Err(e) => eprintln!(
                "{} {} ({}): {}",
                style("Cannot render").yellow(),
                message.ln_id(),
                message.class_name(),
                e
            ),
        }
    }
    Ok(())
}
