//! ASCII tree rendering for session transcripts

use crate::records::{ExchangeRecord, SubEvent};
use crate::transcript::SessionTranscript;
use ascii_tree::Tree;

const PREVIEW_CHARS: usize = 80;

/// Trait for rendering transcripts as ASCII trees
pub trait TranscriptRenderer {
    fn render_as_ascii_tree(&self) -> String;
}

impl TranscriptRenderer for SessionTranscript {
    fn render_as_ascii_tree(&self) -> String {
        let status = if self.is_closed() {
            "CLOSED"
        } else {
            "OPEN"
        };
        let root_label = match &self.start {
            Some(start) => format!(
                "Session {} [{}] - {} ({} exchanges)",
                start.session_id,
                start.model,
                status,
                self.exchanges.len()
            ),
            None => format!(
                "Session {} - {} ({} exchanges)",
                self.session_id().unwrap_or("unknown"),
                status,
                self.exchanges.len()
            ),
        };

        let mut children = Vec::new();

        if let Some(start) = &self.start {
            let mut info = vec![format!("Started: {}", start.timestamp)];
            if !start.cwd.is_empty() {
                info.push(format!("Cwd: {}", start.cwd));
            }
            if !start.tools.is_empty() {
                info.push(format!("Tools: {}", start.tools.join(", ")));
            }
            if let Some(mode) = &start.permission_mode {
                info.push(format!("Permission mode: {mode}"));
            }
            children.push(Tree::Leaf(info));
        }

        for exchange in &self.exchanges {
            children.push(render_exchange(exchange));
        }

        if let Some(end) = &self.end {
            let totals = &end.totals;
            let mut lines = vec![
                format!(
                    "Totals: {} exchanges | {} | API {} | ${:.4}",
                    totals.total_exchanges,
                    format_duration(totals.total_duration_ms),
                    format_duration(totals.total_duration_api_ms),
                    totals.total_cost_usd
                ),
                format!(
                    "Last tokens: in {} / out {} / cache write {} / cache read {}",
                    totals.total_tokens.input,
                    totals.total_tokens.output,
                    totals.total_tokens.cache_creation,
                    totals.total_tokens.cache_read
                ),
            ];
            if !totals.tool_usage.is_empty() {
                let usage = totals
                    .tool_usage
                    .iter()
                    .map(|(name, count)| format!("{name}×{count}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(format!("Tool usage: {usage}"));
            }
            children.push(Tree::Leaf(lines));
        }

        let tree = Tree::Node(root_label, children);
        let mut buffer = String::new();
        match ascii_tree::write_tree(&mut buffer, &tree) {
            Ok(()) => buffer,
            Err(_) => String::new(),
        }
    }
}

fn render_exchange(exchange: &ExchangeRecord) -> Tree {
    let stats = &exchange.stats;
    let label = format!(
        "#{} \"{}\" ({}, {} turns, ${:.4})",
        exchange.exchange,
        preview(&exchange.user_input),
        format_duration(stats.duration_ms),
        stats.num_turns,
        stats.cost_usd
    );

    let mut children: Vec<Tree> = exchange
        .events
        .iter()
        .map(|event| {
            let line = match event {
                SubEvent::AssistantText { text, .. } => format!("assistant: {}", preview(text)),
                SubEvent::ToolUse { id, name, input, .. } => {
                    format!("tool_use {name} [{id}] {}", preview(&input.to_string()))
                }
                SubEvent::ToolResult {
                    tool_use_id,
                    is_error,
                    output,
                    ..
                } => {
                    let marker = if *is_error { "error" } else { "ok" };
                    format!("tool_result [{tool_use_id}] {marker}: {}", preview(output))
                }
            };
            Tree::Leaf(vec![line])
        })
        .collect();

    children.push(Tree::Leaf(vec![format!(
        "tokens: in {} / out {} / cache write {} / cache read {}",
        stats.tokens_in, stats.tokens_out, stats.cache_creation_tokens, stats.cache_read_tokens
    )]));

    Tree::Node(label, children)
}

fn preview(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > PREVIEW_CHARS {
        let cut: String = single_line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        single_line
    }
}

fn format_duration(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        format!("{ms}ms")
    }
}
