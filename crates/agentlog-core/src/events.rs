//! Events consumed from the agent runtime
//!
//! The runtime emits loosely shaped JSON messages. [`AgentEvent::from_value`]
//! classifies them into a closed set of variants. Absent or mistyped fields
//! fall back to empty/zero values so a malformed message can never abort a
//! session.

use crate::records::TokenUsage;
use serde_json::Value;

/// A classified runtime event
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Session initialization data
    Init(InitEvent),
    /// Assistant message with text and tool invocation blocks
    Assistant(AssistantMessage),
    /// Tool results carried back to the model
    ToolResults(ToolResultMessage),
    /// End of one user turn with usage statistics
    Completion(CompletionEvent),
    /// Any message the logger does not track
    Ignored { tag: String },
}

/// Session metadata announced by the runtime
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitEvent {
    pub session_id: String,
    pub model: String,
    pub cwd: String,
    pub tools: Vec<String>,
    pub permission_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantMessage {
    pub blocks: Vec<AssistantBlock>,
}

/// One content block of an assistant message
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResultMessage {
    pub results: Vec<ToolResultBlock>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub is_error: bool,
    pub output: String,
}

/// Statistics reported when a user turn completes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionEvent {
    pub num_turns: u64,
    pub duration_ms: u64,
    pub duration_api_ms: u64,
    pub total_cost_usd: f64,
    pub usage: TokenUsage,
}

impl AgentEvent {
    /// Classify a raw runtime message by its `type` tag
    pub fn from_value(value: &Value) -> Self {
        let tag = str_field(value, "type");
        match tag.as_str() {
            "system" => {
                let subtype = str_field(value, "subtype");
                if subtype == "init" {
                    Self::Init(InitEvent::from_value(value))
                } else {
                    Self::Ignored {
                        tag: format!("system:{subtype}"),
                    }
                }
            }
            "init" => Self::Init(InitEvent::from_value(value)),
            "assistant" => Self::Assistant(AssistantMessage::from_value(value)),
            "user" | "tool_result" => Self::ToolResults(ToolResultMessage::from_value(value)),
            "result" | "completion" => Self::Completion(CompletionEvent::from_value(value)),
            _ => Self::Ignored { tag },
        }
    }

    /// Short name of the variant for diagnostics
    pub fn kind(&self) -> &str {
        match self {
            Self::Init(_) => "init",
            Self::Assistant(_) => "assistant",
            Self::ToolResults(_) => "tool_results",
            Self::Completion(_) => "completion",
            Self::Ignored { .. } => "ignored",
        }
    }
}

impl InitEvent {
    fn from_value(value: &Value) -> Self {
        let tools = value
            .get("tools")
            .and_then(Value::as_array)
            .map(|tools| {
                tools
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let permission_mode = value
            .get("permissionMode")
            .or_else(|| value.get("permission_mode"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            session_id: str_field(value, "session_id"),
            model: str_field(value, "model"),
            cwd: str_field(value, "cwd"),
            tools,
            permission_mode,
        }
    }
}

impl AssistantMessage {
    fn from_value(value: &Value) -> Self {
        let blocks = match message_content(value) {
            Some(Value::String(text)) => vec![AssistantBlock::Text { text: text.clone() }],
            Some(Value::Array(items)) => items.iter().filter_map(parse_assistant_block).collect(),
            _ => Vec::new(),
        };
        Self { blocks }
    }
}

fn parse_assistant_block(block: &Value) -> Option<AssistantBlock> {
    match str_field(block, "type").as_str() {
        "text" => Some(AssistantBlock::Text {
            text: str_field(block, "text"),
        }),
        "tool_use" => Some(AssistantBlock::ToolUse {
            id: str_field(block, "id"),
            name: str_field(block, "name"),
            input: block.get("input").cloned().unwrap_or(Value::Null),
        }),
        // thinking blocks and future block kinds are not part of the audit trail
        _ => None,
    }
}

impl ToolResultMessage {
    fn from_value(value: &Value) -> Self {
        let results = match message_content(value) {
            Some(Value::Array(items)) => items
                .iter()
                .filter(|block| str_field(block, "type") == "tool_result")
                .map(|block| ToolResultBlock {
                    tool_use_id: str_field(block, "tool_use_id"),
                    is_error: block
                        .get("is_error")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    output: tool_output_text(block.get("content")),
                })
                .collect(),
            _ => Vec::new(),
        };
        Self { results }
    }
}

impl CompletionEvent {
    fn from_value(value: &Value) -> Self {
        let usage = value.get("usage").cloned().unwrap_or(Value::Null);
        Self {
            num_turns: u64_field(value, "num_turns"),
            duration_ms: u64_field(value, "duration_ms"),
            duration_api_ms: u64_field(value, "duration_api_ms"),
            total_cost_usd: value
                .get("total_cost_usd")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            usage: TokenUsage {
                input: u64_field(&usage, "input_tokens"),
                output: u64_field(&usage, "output_tokens"),
                cache_creation: u64_field(&usage, "cache_creation_input_tokens"),
                cache_read: u64_field(&usage, "cache_read_input_tokens"),
            },
        }
    }
}

/// `message.content`, falling back to a top-level `content`
fn message_content(value: &Value) -> Option<&Value> {
    value
        .get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| value.get("content"))
}

/// Flatten a tool result payload into the string stored in the log
fn tool_output_text(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items))
            if items
                .iter()
                .all(|item| item.get("text").and_then(Value::as_str).is_some()) =>
        {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Some(other) => other.to_string(),
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Counters above this are not representable and read as 0
const U64_MAX_AS_F64: f64 = u64::MAX as f64;

fn u64_field(value: &Value, key: &str) -> u64 {
    match value.get(key) {
        Some(v) => v
            .as_u64()
            .or_else(|| {
                v.as_f64()
                    .filter(|f| (0.0..=U64_MAX_AS_F64).contains(f))
                    .map(|f| f.round() as u64)
            })
            .unwrap_or(0),
        None => 0,
    }
}
