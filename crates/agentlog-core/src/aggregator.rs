//! Running totals across every exchange of a session

use crate::records::{ExchangeRecord, ExchangeStats, SessionSummary, SessionTotals};

/// Pure accumulation of session statistics, no I/O
#[derive(Debug, Default, Clone)]
pub struct SessionAggregator {
    totals: SessionTotals,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed exchange: durations and cost are summed, the token
    /// snapshot is replaced. Counters saturate instead of overflowing.
    pub fn fold_exchange_stats(&mut self, stats: &ExchangeStats) {
        let totals = &mut self.totals;
        totals.total_exchanges = totals.total_exchanges.saturating_add(1);
        totals.total_duration_ms = totals.total_duration_ms.saturating_add(stats.duration_ms);
        totals.total_duration_api_ms = totals
            .total_duration_api_ms
            .saturating_add(stats.duration_api_ms);
        totals.total_cost_usd += stats.cost_usd;
        totals.total_tokens = stats.tokens();
    }

    pub fn record_tool_use(&mut self, name: &str) {
        let count = self.totals.tool_usage.entry(name.to_string()).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Fold an exchange read back from disk, including its tool invocations
    pub fn fold_exchange_record(&mut self, record: &ExchangeRecord) {
        for name in record.tool_uses() {
            self.record_tool_use(name);
        }
        self.fold_exchange_stats(&record.stats);
    }

    /// Seed state from a previous process
    ///
    /// Anything already folded by this process is kept on top of the prior
    /// totals.
    pub fn load_prior_totals(&mut self, prior: SessionTotals) {
        let current = std::mem::replace(&mut self.totals, prior);
        let totals = &mut self.totals;
        totals.total_exchanges = totals.total_exchanges.saturating_add(current.total_exchanges);
        totals.total_duration_ms = totals
            .total_duration_ms
            .saturating_add(current.total_duration_ms);
        totals.total_duration_api_ms = totals
            .total_duration_api_ms
            .saturating_add(current.total_duration_api_ms);
        totals.total_cost_usd += current.total_cost_usd;
        if current.total_exchanges > 0 {
            totals.total_tokens = current.total_tokens;
        }
        for (name, count) in current.tool_usage {
            let entry = totals.tool_usage.entry(name).or_insert(0);
            *entry = entry.saturating_add(count);
        }
    }

    pub fn snapshot(&self) -> SessionTotals {
        self.totals.clone()
    }

    /// Build the terminal record for a session
    pub fn summary(&self, session_id: &str, timestamp: String) -> SessionSummary {
        SessionSummary {
            timestamp,
            session_id: session_id.to_string(),
            totals: self.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{SubEvent, TokenUsage};

    fn stats(duration_ms: u64, cost_usd: f64, tokens_in: u64, cache_read: u64) -> ExchangeStats {
        ExchangeStats {
            num_turns: 1,
            duration_ms,
            duration_api_ms: duration_ms / 2,
            tokens_in,
            tokens_out: tokens_in * 2,
            cache_creation_tokens: 0,
            cache_read_tokens: cache_read,
            cost_usd,
        }
    }

    #[test]
    fn test_sums_durations_and_cost_but_replaces_tokens() {
        let mut agg = SessionAggregator::new();
        agg.fold_exchange_stats(&stats(100, 0.25, 5, 0));
        agg.fold_exchange_stats(&stats(300, 0.5, 7, 900));

        let totals = agg.snapshot();
        assert_eq!(totals.total_exchanges, 2);
        assert_eq!(totals.total_duration_ms, 400);
        assert_eq!(totals.total_duration_api_ms, 200);
        assert_eq!(totals.total_cost_usd, 0.75);
        assert_eq!(
            totals.total_tokens,
            TokenUsage {
                input: 7,
                output: 14,
                cache_creation: 0,
                cache_read: 900,
            }
        );
    }

    #[test]
    fn test_huge_durations_saturate() {
        let mut agg = SessionAggregator::new();
        agg.fold_exchange_stats(&stats(u64::MAX, 0.0, 1, 0));
        agg.fold_exchange_stats(&stats(u64::MAX, 0.0, 1, 0));

        let mut prior = SessionTotals {
            total_duration_ms: u64::MAX,
            ..Default::default()
        };
        prior.tool_usage.insert("Read".into(), u64::MAX);
        agg.record_tool_use("Read");
        agg.load_prior_totals(prior);

        let totals = agg.snapshot();
        assert_eq!(totals.total_exchanges, 2);
        assert_eq!(totals.total_duration_ms, u64::MAX);
        assert_eq!(totals.total_duration_api_ms, u64::MAX);
        assert_eq!(totals.tool_usage.get("Read"), Some(&u64::MAX));
    }

    #[test]
    fn test_tool_usage_counts() {
        let mut agg = SessionAggregator::new();
        agg.record_tool_use("Read");
        agg.record_tool_use("Read");
        agg.record_tool_use("Bash");
        let totals = agg.snapshot();
        assert_eq!(totals.tool_usage.get("Read"), Some(&2));
        assert_eq!(totals.tool_usage.get("Bash"), Some(&1));
    }

    #[test]
    fn test_prior_totals_keep_current_process_counts() {
        let mut agg = SessionAggregator::new();
        agg.record_tool_use("Bash");

        let mut prior = SessionTotals {
            total_exchanges: 2,
            total_duration_ms: 80,
            total_tokens: TokenUsage {
                input: 9,
                ..Default::default()
            },
            ..Default::default()
        };
        prior.tool_usage.insert("Bash".into(), 2);
        agg.load_prior_totals(prior);

        let totals = agg.snapshot();
        assert_eq!(totals.total_exchanges, 2);
        assert_eq!(totals.total_duration_ms, 80);
        assert_eq!(totals.total_tokens.input, 9);
        assert_eq!(totals.tool_usage.get("Bash"), Some(&3));
    }

    #[test]
    fn test_prior_totals_seed_later_folds() {
        let mut prior = SessionTotals {
            total_exchanges: 3,
            total_duration_ms: 1000,
            total_cost_usd: 0.5,
            ..Default::default()
        };
        prior.tool_usage.insert("Grep".into(), 4);

        let mut agg = SessionAggregator::new();
        agg.load_prior_totals(prior);
        agg.fold_exchange_record(&ExchangeRecord {
            exchange: 4,
            start_time: String::new(),
            end_time: String::new(),
            user_input: String::new(),
            events: vec![SubEvent::ToolUse {
                id: "t".into(),
                name: "Grep".into(),
                input: serde_json::Value::Null,
                timestamp: String::new(),
            }],
            stats: stats(50, 0.25, 1, 0),
        });

        let summary = agg.summary("sess", "now".into());
        assert_eq!(summary.session_id, "sess");
        assert_eq!(summary.totals.total_exchanges, 4);
        assert_eq!(summary.totals.total_duration_ms, 1050);
        assert_eq!(summary.totals.total_cost_usd, 0.75);
        assert_eq!(summary.totals.tool_usage.get("Grep"), Some(&5));
        assert_eq!(summary.totals.total_tokens.input, 1);
    }
}
