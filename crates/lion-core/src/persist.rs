//! JSON Lines storage for messages and logs, one record per line.
use crate::errors::MessageResult;
use crate::models::log::Log;
use crate::models::registry::Message;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Replace the contents of `path` with `messages`
pub fn persist_messages(path: &Path, messages: &[Message]) -> MessageResult<()> {
    write_records(File::create(path)?, messages)
}

/// Add `messages` to the end of `path`, creating it if needed
pub fn append_messages(path: &Path, messages: &[Message]) -> MessageResult<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    write_records(file, messages)
}

/// Load every message stored in `path`, each as the kind it was saved as
pub fn load_messages(path: &Path) -> MessageResult<Vec<Message>> {
    read_records(File::open(path)?)
}

pub fn persist_logs(path: &Path, logs: &[Log]) -> MessageResult<()> {
    write_records(File::create(path)?, logs)
}

pub fn load_logs(path: &Path) -> MessageResult<Vec<Log>> {
    read_records(File::open(path)?)
}

fn write_records<T: Serialize>(file: File, records: &[T]) -> MessageResult<()> {
    let mut writer = io::BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

fn read_records<T: DeserializeOwned>(file: File) -> MessageResult<Vec<T>> {
    let reader = io::BufReader::new(file);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str::<T>(&line)?);
    }

    tracing::debug!("Read {} records", records.len());
    Ok(records)
}
