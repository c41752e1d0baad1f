//! Anthropic Messages API wire format.
//!
//! System messages travel in the top-level `system` field. Tool results are
//! `tool_result` blocks in a user message; consecutive results share one.
//! A request without tools may not carry `tool_use` or `tool_result` blocks,
//! so there the call history is rendered as text blocks.

use std::collections::HashSet;

use serde_json::{json, Value};

use gridops_common::new_tool_call_id;

use super::{
    answered_call_ids, answered_calls, call_as_text, declares_tools, normalize_arguments,
    result_as_text, system_text,
};
use crate::{AiError, AssistantTurn, Message, ModelRequest, Role, ToolCallRequest, ToolSpec};

pub(super) fn format_tool(tool: &ToolSpec) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.input_schema,
    })
}

pub(super) fn build_request_body(request: &ModelRequest) -> Value {
    let answered = answered_call_ids(&request.messages);
    let structured = declares_tools(&request.tools);
    let mut messages: Vec<Value> = Vec::new();
    let mut after_tool_result = false;

    for msg in &request.messages {
        match msg.role {
            Role::System => continue,
            Role::User => messages.push(json!({"role": "user", "content": msg.text()})),
            Role::Assistant => {
                if let Some(rendered) = render_assistant(msg, &answered, structured) {
                    messages.push(rendered);
                }
            }
            Role::Tool => {
                let id = msg.tool_call_id.as_deref().unwrap_or_default();
                let block = if structured {
                    json!({"type": "tool_result", "tool_use_id": id, "content": msg.text()})
                } else {
                    json!({"type": "text", "text": result_as_text(id, msg.text())})
                };
                match messages.last_mut() {
                    Some(last) if after_tool_result => {
                        if let Some(blocks) = last["content"].as_array_mut() {
                            blocks.push(block);
                        }
                    }
                    _ => messages.push(json!({"role": "user", "content": [block]})),
                }
            }
        }
        after_tool_result = msg.role == Role::Tool;
    }

    let mut body = json!({
        "model": request.model.name,
        "max_tokens": request.max_output_tokens,
        "temperature": request.temperature,
        "messages": messages,
    });

    if let Some(system) = system_text(&request.messages) {
        body["system"] = json!(system);
    }

    if structured {
        body["tools"] = request.tools.clone().unwrap_or_default();
    }

    body
}

/// Text and `tool_use` blocks, or text only when the request declares no
/// tools. `None` for a message with nothing to send.
fn render_assistant(msg: &Message, answered: &HashSet<&str>, structured: bool) -> Option<Value> {
    let mut blocks = Vec::new();
    if let Some(text) = msg.content.as_deref().filter(|t| !t.is_empty()) {
        blocks.push(json!({"type": "text", "text": text}));
    }
    for call in answered_calls(msg, answered) {
        blocks.push(if structured {
            json!({
                "type": "tool_use",
                "id": call.id,
                "name": call.name,
                "input": call.arguments,
            })
        } else {
            json!({"type": "text", "text": call_as_text(call)})
        });
    }
    if blocks.is_empty() {
        None
    } else {
        Some(json!({"role": "assistant", "content": blocks}))
    }
}

pub(super) fn parse_tool_calls(raw: &Value) -> Vec<ToolCallRequest> {
    let Some(blocks) = raw.get("content").and_then(Value::as_array) else {
        return Vec::new();
    };

    blocks
        .iter()
        .filter(|b| b["type"] == "tool_use")
        .map(|b| {
            let name = b["name"].as_str().unwrap_or_default().to_string();
            ToolCallRequest {
                id: b["id"]
                    .as_str()
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .unwrap_or_else(new_tool_call_id),
                arguments: normalize_arguments(&name, b.get("input")),
                name,
            }
        })
        .collect()
}

pub(super) fn parse_response(raw: &Value) -> Result<AssistantTurn, AiError> {
    let blocks = raw
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| match raw.pointer("/error/message").and_then(Value::as_str) {
            Some(msg) => AiError::ModelUnavailable(msg.to_string()),
            None => AiError::ModelUnavailable("response has no content blocks".into()),
        })?;

    let text: Vec<&str> = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();

    Ok(AssistantTurn {
        content: if text.is_empty() {
            None
        } else {
            Some(text.join(""))
        },
        tool_calls: parse_tool_calls(raw),
    })
}
