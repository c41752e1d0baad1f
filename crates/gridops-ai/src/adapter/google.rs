//! Gemini `generateContent` wire format.
//!
//! Gemini function calls carry no id, so one is synthesized per call. Tool
//! results go back as `functionResponse` parts, named by looking the call id
//! up in the preceding assistant messages. Requests without function
//! declarations carry the call history as text parts.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};

use gridops_common::new_tool_call_id;

use super::{
    answered_call_ids, answered_calls, call_as_text, declares_tools, normalize_arguments,
    result_as_text, system_text,
};
use crate::{AiError, AssistantTurn, Message, ModelRequest, Role, ToolCallRequest, ToolSpec};

pub(super) fn format_tool(tool: &ToolSpec) -> Value {
    json!({
        "function_declarations": [{
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }]
    })
}

pub(super) fn build_request_body(request: &ModelRequest) -> Value {
    let answered = answered_call_ids(&request.messages);
    let structured = declares_tools(&request.tools);
    let call_names: HashMap<&str, &str> = request
        .messages
        .iter()
        .flat_map(|m| m.tool_calls())
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    let mut contents: Vec<Value> = Vec::new();
    let mut after_tool_result = false;
    for msg in &request.messages {
        match msg.role {
            Role::System => continue,
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{"text": msg.text()}]
            })),
            Role::Assistant => {
                if let Some(rendered) = render_assistant(msg, &answered, structured) {
                    contents.push(rendered);
                }
            }
            Role::Tool => {
                let id = msg.tool_call_id.as_deref().unwrap_or_default();
                let name = call_names.get(id).copied().unwrap_or_default();
                let part = if structured {
                    json!({
                        "functionResponse": {
                            "name": name,
                            "response": response_object(msg.text()),
                        }
                    })
                } else {
                    json!({"text": result_as_text(name, msg.text())})
                };
                match contents.last_mut() {
                    Some(last) if after_tool_result => {
                        if let Some(parts) = last["parts"].as_array_mut() {
                            parts.push(part);
                        }
                    }
                    _ => contents.push(json!({"role": "user", "parts": [part]})),
                }
            }
        }
        after_tool_result = msg.role == Role::Tool;
    }

    let mut body = json!({
        "contents": contents,
        "generationConfig": {
            "maxOutputTokens": request.max_output_tokens,
            "temperature": request.temperature,
        }
    });

    if let Some(system) = system_text(&request.messages) {
        body["systemInstruction"] = json!({"parts": [{"text": system}]});
    }

    if structured {
        body["tools"] = request.tools.clone().unwrap_or_default();
    }

    body
}

fn render_assistant(msg: &Message, answered: &HashSet<&str>, structured: bool) -> Option<Value> {
    let mut parts = Vec::new();
    if let Some(text) = msg.content.as_deref().filter(|t| !t.is_empty()) {
        parts.push(json!({"text": text}));
    }
    for call in answered_calls(msg, answered) {
        parts.push(if structured {
            json!({"functionCall": {"name": call.name, "args": call.arguments}})
        } else {
            json!({"text": call_as_text(call)})
        });
    }
    if parts.is_empty() {
        None
    } else {
        Some(json!({"role": "model", "parts": parts}))
    }
}

/// `functionResponse.response` must be an object.
fn response_object(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(other) => json!({"result": other}),
        Err(_) => json!({"result": text}),
    }
}

fn first_parts(raw: &Value) -> Option<&Vec<Value>> {
    raw.get("candidates")?
        .as_array()?
        .first()?
        .pointer("/content/parts")?
        .as_array()
}

pub(super) fn parse_tool_calls(raw: &Value) -> Vec<ToolCallRequest> {
    let Some(parts) = first_parts(raw) else {
        return Vec::new();
    };

    parts
        .iter()
        .filter_map(|part| part.get("functionCall"))
        .map(|fc| {
            let name = fc["name"].as_str().unwrap_or_default().to_string();
            ToolCallRequest {
                id: fc["id"]
                    .as_str()
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .unwrap_or_else(new_tool_call_id),
                arguments: normalize_arguments(&name, fc.get("args")),
                name,
            }
        })
        .collect()
}

pub(super) fn parse_response(raw: &Value) -> Result<AssistantTurn, AiError> {
    let candidate = raw
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = raw
                .pointer("/promptFeedback/blockReason")
                .or_else(|| raw.pointer("/error/message"))
                .and_then(Value::as_str)
                .unwrap_or("response has no candidates");
            AiError::ModelUnavailable(reason.to_string())
        })?;

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    Ok(AssistantTurn {
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls: parse_tool_calls(raw),
    })
}
