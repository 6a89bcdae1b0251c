//! Exchange logger
//!
//! Consumes the runtime's event stream and writes the session's audit trail.
//! One `exchange` record is appended per completion event, a `session_start`
//! when a new log file is created and a `session_end` on [`ExchangeLogger::close`].
//!
//! Lifecycle: `Uninitialized` until an init event names the session, then
//! `Idle`/`Accumulating` as exchanges open and complete, and `Closed` after
//! `close()`. An exchange may be opened before the init event arrives; its
//! ordinal is adjusted once the log file (and any prior history) is known.
//!
//! Calling [`ExchangeLogger::begin_exchange`] while an exchange is still open
//! discards the buffered exchange and starts a new one (last write wins).

use crate::accumulator::ExchangeAccumulator;
use crate::aggregator::SessionAggregator;
use crate::config::LoggerConfig;
use crate::error::Result;
use crate::events::{
    AgentEvent, AssistantBlock, AssistantMessage, CompletionEvent, InitEvent, ToolResultMessage,
};
use crate::paths::{now_iso, session_file_name};
use crate::records::{ExchangeRecord, ExchangeStats, LogRecord, SessionStart, SessionTotals, SubEvent};
use crate::store::LogStore;
use chrono::Utc;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Observable lifecycle state of a logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    Uninitialized,
    Idle,
    Accumulating,
    Closed,
}

#[derive(Debug, Clone)]
struct SessionInfo {
    session_id: String,
    resumed: bool,
}

/// Session/exchange logger driven by one event loop
pub struct ExchangeLogger {
    config: LoggerConfig,
    store: LogStore,
    session: Option<SessionInfo>,
    exchange_counter: u64,
    accumulator: ExchangeAccumulator,
    aggregator: SessionAggregator,
    /// Exchanges completed before the log file existed
    pending: Vec<ExchangeRecord>,
    summary_written: bool,
    closed: bool,
}

impl ExchangeLogger {
    /// Create a logger; nothing touches the filesystem until the init event
    pub fn new(config: LoggerConfig) -> Result<Self> {
        config.validate()?;
        let store = LogStore::new(config.log_dir.clone()).with_sync_writes(config.sync_writes);

        debug!(log_dir = %config.log_dir.display(), "Initializing exchange logger");

        Ok(Self {
            config,
            store,
            session: None,
            exchange_counter: 0,
            accumulator: ExchangeAccumulator::new(),
            aggregator: SessionAggregator::new(),
            pending: Vec::new(),
            summary_written: false,
            closed: false,
        })
    }

    /// Logger rooted at `log_dir` with default settings
    pub fn in_dir<P: AsRef<Path>>(log_dir: P) -> Result<Self> {
        Self::new(LoggerConfig::new(log_dir.as_ref()))
    }

    pub fn state(&self) -> LoggerState {
        if self.closed {
            LoggerState::Closed
        } else if self.accumulator.is_open() {
            LoggerState::Accumulating
        } else if self.session.is_none() {
            LoggerState::Uninitialized
        } else {
            LoggerState::Idle
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    /// Whether the session was re-attached to an existing log file
    pub fn is_resumed(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.resumed)
    }

    /// Active log file, once the session is initialized
    pub fn log_path(&self) -> Option<&Path> {
        self.store.active_path()
    }

    /// Ordinal of the most recently opened exchange
    pub fn exchange_count(&self) -> u64 {
        self.exchange_counter
    }

    pub fn totals(&self) -> SessionTotals {
        self.aggregator.snapshot()
    }

    /// Open a new exchange for the given user input
    pub fn begin_exchange(&mut self, user_input: &str) {
        if self.closed {
            warn!("begin_exchange called on a closed logger, ignoring");
            return;
        }

        if let Some(open) = self.accumulator.number() {
            let buffered = self.accumulator.discard();
            warn!(
                exchange = open,
                buffered,
                "Exchange began before the previous one completed, discarding it"
            );
        }

        self.exchange_counter = self.exchange_counter.saturating_add(1);
        self.accumulator
            .begin(self.exchange_counter, user_input, now_iso());

        debug!(exchange = self.exchange_counter, "Exchange started");
    }

    /// Dispatch one classified runtime event
    pub fn observe(&mut self, event: &AgentEvent) -> Result<()> {
        if self.closed {
            warn!(event = event.kind(), "Event observed after close, ignoring");
            return Ok(());
        }

        match event {
            AgentEvent::Init(init) => self.handle_init(init),
            AgentEvent::Assistant(message) => {
                self.handle_assistant(message);
                Ok(())
            }
            AgentEvent::ToolResults(message) => {
                self.handle_tool_results(message);
                Ok(())
            }
            AgentEvent::Completion(done) => self.handle_completion(done),
            AgentEvent::Ignored { tag } => {
                debug!(tag = %tag, "Ignoring untracked event");
                Ok(())
            }
        }
    }

    /// Classify and dispatch a raw runtime message
    pub fn observe_value(&mut self, value: &Value) -> Result<()> {
        self.observe(&AgentEvent::from_value(value))
    }

    /// Parse one JSON line and dispatch it; unparsable lines are skipped
    pub fn observe_json(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.observe_value(&value),
            Err(e) => {
                warn!(error = %e, "Skipping event line that is not valid JSON");
                Ok(())
            }
        }
    }

    fn handle_init(&mut self, init: &InitEvent) -> Result<()> {
        if let Some(session) = &self.session {
            if session.session_id != init.session_id {
                warn!(
                    session_id = %session.session_id,
                    other = %init.session_id,
                    "Init for a different session on an initialized logger, ignoring"
                );
            } else {
                debug!(session_id = %session.session_id, "Repeated init event, ignoring");
            }
            return Ok(());
        }

        if init.session_id.is_empty() {
            warn!("Init event without session_id, ignoring");
            return Ok(());
        }

        self.store.ensure_dir()?;
        let prefix_len = self.config.id_prefix_len;

        match self
            .store
            .find_by_session_suffix(&init.session_id, prefix_len)?
        {
            Some(path) => {
                let resume = self.store.scan_resume_state(&path)?;
                if resume.had_summary {
                    self.store.drop_trailing_summary(&path)?;
                }
                self.store.adopt(path.clone())?;

                // exchanges opened before init are numbered after the history
                self.exchange_counter = self.exchange_counter.saturating_add(resume.last_exchange);
                self.accumulator.renumber(self.exchange_counter);
                for record in &mut self.pending {
                    record.exchange = record.exchange.saturating_add(resume.last_exchange);
                }
                self.aggregator.load_prior_totals(resume.totals);
                self.session = Some(SessionInfo {
                    session_id: init.session_id.clone(),
                    resumed: true,
                });

                info!(
                    session_id = %init.session_id,
                    log_file = %path.display(),
                    prior_exchanges = resume.last_exchange,
                    "Resumed session log"
                );
                self.flush_pending()?;
            }
            None => {
                let file_name = session_file_name(Utc::now(), &init.session_id, prefix_len);
                let path = self.store.create(&file_name)?;
                self.session = Some(SessionInfo {
                    session_id: init.session_id.clone(),
                    resumed: false,
                });

                self.store.append(&LogRecord::SessionStart(SessionStart {
                    timestamp: now_iso(),
                    session_id: init.session_id.clone(),
                    model: init.model.clone(),
                    cwd: init.cwd.clone(),
                    tools: init.tools.clone(),
                    permission_mode: init.permission_mode.clone(),
                }))?;

                info!(
                    session_id = %init.session_id,
                    model = %init.model,
                    log_file = %path.display(),
                    "Started session log"
                );
                self.flush_pending()?;
            }
        }

        Ok(())
    }

    fn handle_assistant(&mut self, message: &AssistantMessage) {
        if !self.accumulator.is_open() {
            debug!("Assistant message outside an exchange, ignoring");
            return;
        }

        for block in &message.blocks {
            let sub_event = match block {
                AssistantBlock::Text { text } => SubEvent::AssistantText {
                    text: text.clone(),
                    timestamp: now_iso(),
                },
                AssistantBlock::ToolUse { id, name, input } => {
                    self.aggregator.record_tool_use(name);
                    SubEvent::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                        timestamp: now_iso(),
                    }
                }
            };
            self.accumulator.push(sub_event);
        }
    }

    fn handle_tool_results(&mut self, message: &ToolResultMessage) {
        if !self.accumulator.is_open() {
            debug!("Tool results outside an exchange, ignoring");
            return;
        }

        for result in &message.results {
            self.accumulator.push(SubEvent::ToolResult {
                tool_use_id: result.tool_use_id.clone(),
                is_error: result.is_error,
                output: result.output.clone(),
                timestamp: now_iso(),
            });
        }
    }

    fn handle_completion(&mut self, done: &CompletionEvent) -> Result<()> {
        let stats = ExchangeStats {
            num_turns: done.num_turns,
            duration_ms: done.duration_ms,
            duration_api_ms: done.duration_api_ms,
            tokens_in: done.usage.input,
            tokens_out: done.usage.output,
            cache_creation_tokens: done.usage.cache_creation,
            cache_read_tokens: done.usage.cache_read,
            cost_usd: done.total_cost_usd,
        };

        let Some(record) = self.accumulator.finish(stats, now_iso()) else {
            debug!("Completion without an open exchange, ignoring");
            return Ok(());
        };

        // totals do not depend on the write succeeding
        self.aggregator.fold_exchange_stats(&record.stats);

        info!(
            exchange = record.exchange,
            sub_events = record.events.len(),
            duration_ms = record.stats.duration_ms,
            cost_usd = record.stats.cost_usd,
            "Exchange completed"
        );

        if self.store.active_path().is_none() {
            debug!(exchange = record.exchange, "No log file yet, holding exchange until init");
            self.pending.push(record);
            return Ok(());
        }

        self.flush_pending()?;
        self.store.append(&LogRecord::Exchange(record))
    }

    fn flush_pending(&mut self) -> Result<()> {
        for record in std::mem::take(&mut self.pending) {
            self.store.append(&LogRecord::Exchange(record))?;
        }
        Ok(())
    }

    /// Write the session summary
    ///
    /// A no-op before the session is initialized. Calling it again replaces
    /// the previous summary so the file keeps a single trailing `session_end`.
    pub fn close(&mut self) -> Result<()> {
        let Some(session) = self.session.clone() else {
            if self.pending.is_empty() {
                debug!("Closing logger without a session, nothing to write");
            } else {
                warn!(
                    exchanges = self.pending.len(),
                    "Closing logger without a session, completed exchanges are not persisted"
                );
            }
            return Ok(());
        };

        if self.accumulator.is_open() {
            let dropped = self.accumulator.discard();
            warn!(
                session_id = %session.session_id,
                sub_events = dropped,
                "Closing with an exchange still open, its events are not persisted"
            );
        }

        if self.summary_written {
            if let Some(path) = self.store.active_path().map(Path::to_path_buf) {
                self.store.drop_trailing_summary(&path)?;
            }
        }

        let summary = self.aggregator.summary(&session.session_id, now_iso());
        let total_exchanges = summary.totals.total_exchanges;
        self.closed = true;
        self.store.append(&LogRecord::SessionEnd(summary))?;
        self.summary_written = true;

        info!(
            session_id = %session.session_id,
            total_exchanges,
            "Session log closed"
        );
        Ok(())
    }
}

impl Drop for ExchangeLogger {
    fn drop(&mut self) {
        if self.session.is_some() && !self.closed {
            if let Err(e) = self.close() {
                warn!("Failed to write session summary on drop: {}", e);
            }
        }
    }
}
