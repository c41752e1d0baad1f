//! Chat-completions wire format (OpenAI, Mistral).

use serde_json::{json, Value};

use gridops_common::new_tool_call_id;

use super::{
    answered_call_ids, answered_calls, declares_tools, decode_arguments, normalize_arguments,
};
use crate::{AiError, AssistantTurn, Message, ModelRequest, Role, ToolCallRequest, ToolSpec};

pub(super) fn format_tool(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

pub(super) fn build_request_body(request: &ModelRequest) -> Value {
    let answered = answered_call_ids(&request.messages);
    let messages: Vec<Value> = request
        .messages
        .iter()
        .filter_map(|msg| match msg.role {
            Role::System => Some(json!({"role": "system", "content": msg.text()})),
            Role::User => Some(json!({"role": "user", "content": msg.text()})),
            Role::Tool => Some(json!({
                "role": "tool",
                "tool_call_id": msg.tool_call_id.as_deref().unwrap_or_default(),
                "content": msg.text(),
            })),
            Role::Assistant => render_assistant(msg, &answered),
        })
        .collect();

    let mut body = json!({
        "model": request.model.name,
        "messages": messages,
        "temperature": request.temperature,
        "max_tokens": request.max_output_tokens,
    });

    if declares_tools(&request.tools) {
        body["tools"] = request.tools.clone().unwrap_or_default();
    }

    body
}

/// `None` when the message has neither text nor an answered call: the API
/// requires one of the two.
fn render_assistant(msg: &Message, answered: &std::collections::HashSet<&str>) -> Option<Value> {
    let calls: Vec<Value> = answered_calls(msg, answered)
        .into_iter()
        .map(|call| {
            json!({
                "id": call.id,
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": call.arguments.to_string(),
                }
            })
        })
        .collect();
    let has_text = msg.content.as_deref().is_some_and(|t| !t.is_empty());
    if calls.is_empty() && !has_text {
        return None;
    }

    let mut out = json!({
        "role": "assistant",
        "content": msg.content,
    });
    if !calls.is_empty() {
        out["tool_calls"] = Value::Array(calls);
    }
    Some(out)
}

fn first_message(raw: &Value) -> Option<&Value> {
    raw.get("choices")?.as_array()?.first()?.get("message")
}

pub(super) fn parse_tool_calls(raw: &Value) -> Vec<ToolCallRequest> {
    let Some(calls) = first_message(raw)
        .and_then(|m| m.get("tool_calls"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    calls
        .iter()
        .map(|call| {
            let function = call.get("function");
            let name = function
                .and_then(|f| f.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let arguments = match function.and_then(|f| f.get("arguments")) {
                Some(Value::String(text)) => decode_arguments(&name, text),
                other => normalize_arguments(&name, other),
            };
            let id = call
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .unwrap_or_else(new_tool_call_id);
            ToolCallRequest {
                id,
                name,
                arguments,
            }
        })
        .collect()
}

pub(super) fn parse_response(raw: &Value) -> Result<AssistantTurn, AiError> {
    let message = first_message(raw).ok_or_else(|| unrecognized(raw))?;
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .map(String::from);

    Ok(AssistantTurn {
        content,
        tool_calls: parse_tool_calls(raw),
    })
}

fn unrecognized(raw: &Value) -> AiError {
    match raw.pointer("/error/message").and_then(Value::as_str) {
        Some(msg) => AiError::ModelUnavailable(msg.to_string()),
        None => AiError::ModelUnavailable("response has no choices[0].message".into()),
    }
}
