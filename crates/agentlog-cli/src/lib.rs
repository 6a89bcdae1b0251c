//! Replay driver for the `agentlog` binary
//!
//! Feeds a recorded NDJSON event stream through an [`ExchangeLogger`] so a
//! session log can be produced offline from captured runtime output.

use agentlog_core::ExchangeLogger;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tag of the synthetic line that opens an exchange during replay
pub const PROMPT_TAG: &str = "prompt";

/// Counts collected while replaying one event stream
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub lines: usize,
    pub prompts: usize,
    pub exchanges: u64,
    pub log_path: Option<PathBuf>,
}

/// Open a replay source; `-` reads from stdin
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open event stream: {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Drive `logger` from an NDJSON reader and close it at end of input
///
/// A line `{"type":"prompt","text":..}` begins an exchange, every other line
/// is handed to the logger as a runtime event.
pub fn replay_events<R: BufRead>(logger: &mut ExchangeLogger, reader: R) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read event line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;

        match prompt_text(&line) {
            Some(text) => {
                debug!(line = index + 1, "Replaying prompt");
                summary.prompts += 1;
                logger.begin_exchange(&text);
            }
            None => logger
                .observe_json(&line)
                .with_context(|| format!("Failed to log event on line {}", index + 1))?,
        }
    }

    logger.close().context("Failed to close session log")?;

    summary.exchanges = logger.totals().total_exchanges;
    summary.log_path = logger.log_path().map(Path::to_path_buf);
    info!(
        lines = summary.lines,
        prompts = summary.prompts,
        exchanges = summary.exchanges,
        "Replay finished"
    );
    Ok(summary)
}

fn prompt_text(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line).ok()?;
    if value.get("type").and_then(Value::as_str) != Some(PROMPT_TAG) {
        return None;
    }
    Some(
        value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    )
}
