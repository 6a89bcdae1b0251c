//! In-memory buffer for the exchange currently in flight

use crate::records::{ExchangeRecord, ExchangeStats, SubEvent};

/// Buffers the sub-events of one open exchange
#[derive(Debug, Default)]
pub struct ExchangeAccumulator {
    open: bool,
    number: u64,
    start_time: String,
    user_input: String,
    events: Vec<SubEvent>,
}

impl ExchangeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new exchange, dropping anything buffered for a previous one
    pub fn begin(&mut self, number: u64, user_input: impl Into<String>, start_time: String) {
        self.open = true;
        self.number = number;
        self.start_time = start_time;
        self.user_input = user_input.into();
        self.events.clear();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Ordinal of the open exchange
    pub fn number(&self) -> Option<u64> {
        self.open.then_some(self.number)
    }

    /// Change the ordinal of the open exchange
    pub fn renumber(&mut self, number: u64) {
        if self.open {
            self.number = number;
        }
    }

    /// Append a sub-event; ignored when no exchange is open
    pub fn push(&mut self, event: SubEvent) -> bool {
        if !self.open {
            return false;
        }
        self.events.push(event);
        true
    }

    /// Close the open exchange and hand back its record
    pub fn finish(&mut self, stats: ExchangeStats, end_time: String) -> Option<ExchangeRecord> {
        if !self.open {
            return None;
        }
        self.open = false;
        Some(ExchangeRecord {
            exchange: self.number,
            start_time: std::mem::take(&mut self.start_time),
            end_time,
            user_input: std::mem::take(&mut self.user_input),
            events: std::mem::take(&mut self.events),
            stats,
        })
    }

    /// Drop the open exchange without producing a record
    pub fn discard(&mut self) -> usize {
        let dropped = self.events.len();
        self.open = false;
        self.user_input.clear();
        self.start_time.clear();
        self.events.clear();
        dropped
    }
}
