//! Read-back of session log files

use crate::error::{LogError, Result};
use crate::records::{ExchangeRecord, LogRecord, SessionStart, SessionSummary};
use crate::store::read_lines;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A session log parsed back into its records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionTranscript {
    #[serde(skip)]
    pub path: PathBuf,
    pub start: Option<SessionStart>,
    /// Exchange records in file order
    pub exchanges: Vec<ExchangeRecord>,
    /// Last `session_end` record of the file
    pub end: Option<SessionSummary>,
    /// Number of `session_end` records seen
    #[serde(skip)]
    pub summary_count: usize,
}

impl SessionTranscript {
    /// Load and parse a log file
    pub fn load(path: &Path) -> Result<Self> {
        let mut transcript = Self {
            path: path.to_path_buf(),
            start: None,
            exchanges: Vec::new(),
            end: None,
            summary_count: 0,
        };

        for (index, line) in read_lines(path)?.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str::<LogRecord>(line)
                .map_err(|e| LogError::parse(path, index + 1, e))?;
            match record {
                LogRecord::SessionStart(start) => {
                    if transcript.start.is_none() {
                        transcript.start = Some(start);
                    }
                }
                LogRecord::Exchange(exchange) => transcript.exchanges.push(exchange),
                LogRecord::SessionEnd(summary) => {
                    transcript.summary_count += 1;
                    transcript.end = Some(summary);
                }
            }
        }

        Ok(transcript)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.start
            .as_ref()
            .map(|s| s.session_id.as_str())
            .or_else(|| self.end.as_ref().map(|e| e.session_id.as_str()))
    }

    /// Whether the file ends with a session summary
    pub fn is_closed(&self) -> bool {
        self.end.is_some()
    }

    /// Tool invocations across every exchange
    pub fn tool_use_count(&self) -> usize {
        self.exchanges.iter().map(|e| e.tool_uses().count()).sum()
    }
}
