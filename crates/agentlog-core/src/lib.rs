//! # Agentlog Core
//!
//! Session and exchange logging for conversational agent runtimes.
//!
//! The runtime emits an unordered stream of heterogeneous messages. The
//! [`ExchangeLogger`] classifies them, buffers the events of the exchange in
//! flight and appends one JSON line per completed exchange to a per-session
//! file. A session seen again by a later process is re-attached to its
//! existing file with its totals recovered.

pub mod accumulator;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod logger;
pub mod paths;
pub mod records;
pub mod renderer;
pub mod store;
pub mod transcript;

pub use config::LoggerConfig;
pub use error::{LogError, Result};
pub use events::AgentEvent;
pub use export::{ExportFormat, TranscriptExporter};
pub use logger::{ExchangeLogger, LoggerState};
pub use records::{
    ExchangeRecord, ExchangeStats, LogRecord, SessionStart, SessionSummary, SessionTotals,
    SubEvent, TokenUsage,
};
pub use renderer::TranscriptRenderer;
pub use store::{list_sessions, LogStore};
pub use transcript::SessionTranscript;
