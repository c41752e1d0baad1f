//! Provider adapters: canonical tools and messages to and from each
//! provider's wire shape.
//!
//! OpenAI and Mistral share the chat-completions format; Anthropic uses the
//! Messages API and Google the `generateContent` API. Every public function
//! dispatches with one `match` on [`Provider`].

mod anthropic;
mod chat_completions;
mod google;

use std::collections::HashSet;

use serde_json::{json, Value};
use tracing::warn;

use crate::registry::Provider;
use crate::{AiError, AssistantTurn, Message, ModelRequest, Role, ToolCallRequest, ToolSpec};

const ANTHROPIC_GUIDANCE: &str =
    "Include detailed technical analysis of grid load patterns and equipment status.";
const GOOGLE_GUIDANCE: &str =
    "Structure response with clear sections for load analysis, risk assessment, and recommendations.";
const DEFAULT_GUIDANCE: &str = "Provide concise, actionable insights for grid operators.";

/// Render tool specs in the provider's tool-declaration shape. Every tool
/// maps; the result is a JSON array.
pub fn format_tools(tools: &[ToolSpec], provider: Provider) -> Value {
    let formatted: Vec<Value> = match provider {
        Provider::Anthropic => tools.iter().map(anthropic::format_tool).collect(),
        Provider::Google => tools.iter().map(google::format_tool).collect(),
        Provider::OpenAi | Provider::Mistral => {
            tools.iter().map(chat_completions::format_tool).collect()
        }
    };
    Value::Array(formatted)
}

/// Adapt the system prompt to the provider. Only appends or reformats, and
/// applying it twice gives the same text as applying it once.
pub fn format_system_prompt(text: &str, provider: Provider) -> String {
    match provider {
        Provider::Anthropic => append_guidance(text, ANTHROPIC_GUIDANCE),
        Provider::Google => append_guidance(text, GOOGLE_GUIDANCE),
        Provider::Mistral => collapse_whitespace(text),
        Provider::OpenAi => append_guidance(text, DEFAULT_GUIDANCE),
    }
}

/// Extract the tool calls from a raw response. Total: an unrecognized
/// response shape yields no calls, and argument text that is not a JSON
/// object becomes `{"raw_input": text}`.
pub fn parse_tool_calls(raw: &Value, provider: Provider) -> Vec<ToolCallRequest> {
    match provider {
        Provider::Anthropic => anthropic::parse_tool_calls(raw),
        Provider::Google => google::parse_tool_calls(raw),
        Provider::OpenAi | Provider::Mistral => chat_completions::parse_tool_calls(raw),
    }
}

/// Copy the content and tool calls out of a raw response.
pub fn parse_response(raw: &Value, provider: Provider) -> Result<AssistantTurn, AiError> {
    match provider {
        Provider::Anthropic => anthropic::parse_response(raw),
        Provider::Google => google::parse_response(raw),
        Provider::OpenAi | Provider::Mistral => chat_completions::parse_response(raw),
    }
}

/// Build the HTTP request body for `request.model`'s provider.
pub fn build_request_body(request: &ModelRequest) -> Value {
    match request.model.provider {
        Provider::Anthropic => anthropic::build_request_body(request),
        Provider::Google => google::build_request_body(request),
        Provider::OpenAi | Provider::Mistral => chat_completions::build_request_body(request),
    }
}

fn append_guidance(text: &str, guidance: &str) -> String {
    if text.contains(guidance) {
        return text.to_string();
    }
    let base = text.trim_end();
    if base.is_empty() {
        guidance.to_string()
    } else {
        format!("{base}\n\n{guidance}")
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode model-supplied argument text into a JSON object, falling back to
/// the `raw_input` wrapper.
pub(crate) fn decode_arguments(tool: &str, text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(_) | Err(_) => {
            warn!(tool = %tool, arguments = %text, "malformed tool arguments, passing raw input");
            json!({ "raw_input": text })
        }
    }
}

/// Normalize an already-decoded argument value: objects pass through,
/// strings are decoded, a missing value is an empty object.
pub(crate) fn normalize_arguments(tool: &str, value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => json!({}),
        Some(Value::Object(map)) => Value::Object(map.clone()),
        Some(Value::String(text)) => decode_arguments(tool, text),
        Some(other) => decode_arguments(tool, &other.to_string()),
    }
}

/// Ids of tool calls that have a result message in `messages`. Calls
/// without one (the tool failed and was dropped) are left out of replayed
/// assistant messages, since every provider rejects an unanswered call.
pub(crate) fn answered_call_ids(messages: &[Message]) -> HashSet<&str> {
    messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect()
}

pub(crate) fn answered_calls<'a>(
    message: &'a Message,
    answered: &HashSet<&str>,
) -> Vec<&'a ToolCallRequest> {
    message
        .tool_calls()
        .iter()
        .filter(|call| answered.contains(call.id.as_str()))
        .collect()
}

/// True when the request carries a non-empty tool list.
pub(crate) fn declares_tools(tools: &Option<Value>) -> bool {
    tools
        .as_ref()
        .is_some_and(|t| t.as_array().map_or(true, |arr| !arr.is_empty()))
}

/// Plain-text form of a tool call, for requests that declare no tools.
/// Anthropic and Google reject structured call history in that case.
pub(crate) fn call_as_text(call: &ToolCallRequest) -> String {
    format!("Called {} {}", call.name, call.arguments)
}

/// Plain-text form of a tool result; see [`call_as_text`].
pub(crate) fn result_as_text(label: &str, text: &str) -> String {
    format!("Result for {label}: {text}")
}

/// Concatenated text of every system message.
pub(crate) fn system_text(messages: &[Message]) -> Option<String> {
    let parts: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(Message::text)
        .filter(|t| !t.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}
