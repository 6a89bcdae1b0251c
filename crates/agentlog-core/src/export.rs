//! Transcript export to YAML or pretty JSON

use crate::error::{LogError, Result};
use crate::transcript::SessionTranscript;
use std::fs;
use std::path::Path;

/// Output format for [`TranscriptExporter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Yaml,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(LogError::config(format!("unknown export format '{other}'"))),
        }
    }
}

/// Session log to YAML/JSON converter
pub struct TranscriptExporter;

impl TranscriptExporter {
    /// Render a transcript in the requested format
    pub fn render(transcript: &SessionTranscript, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Yaml => Self::to_yaml(transcript),
            ExportFormat::Json => Self::to_json(transcript),
        }
    }

    pub fn to_yaml(transcript: &SessionTranscript) -> Result<String> {
        Ok(serde_yaml::to_string(transcript)?)
    }

    pub fn to_json(transcript: &SessionTranscript) -> Result<String> {
        serde_json::to_string_pretty(transcript)
            .map_err(|e| LogError::serialize(&transcript.path, e))
    }

    /// Convert a session log file and write the result to `out_path`
    pub fn convert_file(
        jsonl_path: &Path,
        out_path: &Path,
        format: ExportFormat,
    ) -> Result<SessionTranscript> {
        let transcript = SessionTranscript::load(jsonl_path)?;
        let rendered = Self::render(&transcript, format)?;
        fs::write(out_path, rendered)
            .map_err(|e| LogError::io("writing exported transcript", out_path, e))?;
        Ok(transcript)
    }
}
