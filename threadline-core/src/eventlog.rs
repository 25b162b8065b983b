//! Event log loading.
//!
//! A log file is either a single JSON array of events or JSON Lines with one
//! event per line. Blank lines in JSON Lines input are skipped.

use crate::error::{Error, Result};
use crate::types::Event;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Read and parse an event log from disk.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;

    let events = parse_events(&content)?;
    tracing::debug!(path = %path.display(), events = events.len(), "Read event log");
    Ok(events)
}

/// Parse an event log held in memory.
pub fn parse_events(content: &str) -> Result<Vec<Event>> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).map_err(|e| Error::Parse {
            line: e.line(),
            message: e.to_string(),
        });
    }
    parse_lines(BufReader::new(content.as_bytes()))
}

fn parse_lines(reader: impl BufRead) -> Result<Vec<Event>> {
    let mut events = Vec::new();

    for (offset, line_result) in reader.lines().enumerate() {
        let line_number = offset + 1;
        let line = line_result?;

        if line.trim().is_empty() {
            continue;
        }

        let event: Event = serde_json::from_str(&line).map_err(|e| Error::Parse {
            line: line_number,
            message: e.to_string(),
        })?;
        events.push(event);
    }

    Ok(events)
}
