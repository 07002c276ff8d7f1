use anyhow::{Context, Result};
use console::style;
use lion_core::models::log::Log;
use lion_core::models::registry::Message;
use lion_core::persist::{load_messages, persist_logs};
use std::path::Path;

pub fn execute(file: &Path, out: Option<&Path>) -> Result<()> {
    let messages = load_messages(file)
        .with_context(|| format!("Failed to load messages from {}", file.display()))?;
    tracing::debug!("Loaded {} messages from {}", messages.len(), file.display());

    let logs: Vec<Log> = messages.iter().map(Message::to_log).collect();
    for log in &logs {
        println!("{}", serde_json::to_string(log)?);
    }

    if let Some(out) = out {
        persist_logs(out, &logs).with_context(|| format!("Failed to write {}", out.display()))?;
        eprintln!("{} {}", style("Saved logs to").green(), out.display());
    }
    Ok(())
}
