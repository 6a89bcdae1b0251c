//! Records persisted to a session log
//!
//! A log file holds one JSON object per line, discriminated by a `type`
//! field: `session_start`, then any number of `exchange` records, then a
//! single trailing `session_end` once the session is closed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One line of a session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogRecord {
    SessionStart(SessionStart),
    Exchange(ExchangeRecord),
    SessionEnd(SessionSummary),
}

impl LogRecord {
    /// Value of the `type` tag
    pub fn record_type(&self) -> &'static str {
        match self {
            Self::SessionStart(_) => "session_start",
            Self::Exchange(_) => "exchange",
            Self::SessionEnd(_) => "session_end",
        }
    }
}

/// Session metadata written once when a log file is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStart {
    pub timestamp: String,
    pub session_id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
}

/// A completed user round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// Ordinal within the session, starting at 1
    pub exchange: u64,
    pub start_time: String,
    pub end_time: String,
    pub user_input: String,
    /// Sub-events in arrival order
    #[serde(default)]
    pub events: Vec<SubEvent>,
    #[serde(default)]
    pub stats: ExchangeStats,
}

impl ExchangeRecord {
    /// Tool invocations recorded in this exchange, in order
    pub fn tool_uses(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            SubEvent::ToolUse { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }
}

/// One atomic unit inside an exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubEvent {
    AssistantText {
        text: String,
        timestamp: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
        timestamp: String,
    },
    ToolResult {
        tool_use_id: String,
        is_error: bool,
        output: String,
        timestamp: String,
    },
}

/// Per-exchange statistics reported by the runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeStats {
    pub num_turns: u64,
    pub duration_ms: u64,
    pub duration_api_ms: u64,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub cost_usd: f64,
}

impl ExchangeStats {
    /// Token counters of this exchange
    pub fn tokens(&self) -> TokenUsage {
        TokenUsage {
            input: self.tokens_in,
            output: self.tokens_out,
            cache_creation: self.cache_creation_tokens,
            cache_read: self.cache_read_tokens,
        }
    }
}

/// Token counters by category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub cache_creation: u64,
    pub cache_read: u64,
}

/// Running session totals
///
/// `total_tokens` is the usage of the most recently completed exchange. The
/// runtime is stateful, so later exchanges already count earlier context in
/// their cache reads and summing them would overcount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTotals {
    pub total_exchanges: u64,
    pub total_duration_ms: u64,
    pub total_duration_api_ms: u64,
    pub total_cost_usd: f64,
    pub total_tokens: TokenUsage,
    pub tool_usage: BTreeMap<String, u64>,
}

/// Terminal record of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub timestamp: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(flatten)]
    pub totals: SessionTotals,
}
