//! Session tests against scripted model and tool fakes.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::bridge::{ToolExecutionError, ToolExecutor};
use crate::registry::{ModelIdentifier, Provider};
use crate::adapter::build_request_body;
use crate::{AiError, Message, ModelRequest, ModelService, Role, ToolSpec};

/// Replays canned chat-completions responses and records every request.
#[derive(Default)]
struct ScriptedModel {
    responses: Mutex<VecDeque<Result<Value, AiError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    fn new(responses: Vec<Result<Value, AiError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelService for ScriptedModel {
    async fn complete(&self, request: &ModelRequest) -> Result<Value, AiError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::ModelUnavailable("script exhausted".into())))
    }
}

enum Outcome {
    Ok(Value),
    Fail,
    Hang,
    CancelThenHang(CancellationToken),
}

/// Tool server stand-in keyed by tool name.
#[derive(Default)]
struct FakeTools {
    outcomes: HashMap<String, Outcome>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeTools {
    fn with(mut self, name: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(name.to_string(), outcome);
        self
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for FakeTools {
    async fn execute(&self, name: &str, arguments: &Value) -> Result<Value, ToolExecutionError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        match self.outcomes.get(name) {
            Some(Outcome::Ok(v)) => Ok(v.clone()),
            Some(Outcome::Fail) | None => {
                Err(ToolExecutionError::Remote(format!("{name} failed")))
            }
            Some(Outcome::Hang) => std::future::pending().await,
            Some(Outcome::CancelThenHang(token)) => {
                token.cancel();
                std::future::pending().await
            }
        }
    }
}

fn text_response(text: &str) -> Result<Value, AiError> {
    Ok(json!({"choices": [{"message": {"role": "assistant", "content": text}}]}))
}

fn tool_response(calls: Value) -> Result<Value, AiError> {
    Ok(json!({"choices": [{"message": {"role": "assistant", "content": null, "tool_calls": calls}}]}))
}

fn call(id: &str, name: &str, arguments: &str) -> Value {
    json!({"id": id, "type": "function", "function": {"name": name, "arguments": arguments}})
}

fn grid_tools() -> Vec<ToolSpec> {
    ["get_grid_topology", "get_equipment_status", "analyze_load_pattern"]
        .iter()
        .map(|name| ToolSpec {
            name: name.to_string(),
            description: format!("{name} description"),
            input_schema: json!({"type": "object"}),
        })
        .collect()
}

fn session(model: Arc<ScriptedModel>, tools: Arc<FakeTools>) -> Session {
    session_on(ModelIdentifier::new(Provider::OpenAi, "gpt-4o"), model, tools)
}

fn session_on(id: ModelIdentifier, model: Arc<ScriptedModel>, tools: Arc<FakeTools>) -> Session {
    Session::new(id, model, tools)
        .with_system_prompt("You are a Grid Operations Assistant.")
        .with_tools(grid_tools())
}

/// Every content block (Anthropic) or part (Google) in a rendered body.
fn blocks(body: &Value, list: &str, key: &str) -> Vec<Value> {
    body[list]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|m| m[key].as_array())
        .flatten()
        .cloned()
        .collect()
}

#[tokio::test]
async fn answer_without_tools_uses_one_call() {
    let model = ScriptedModel::new(vec![text_response("Grid is stable.")]);
    let tools = Arc::new(FakeTools::default());
    let mut s = session(model.clone(), tools.clone());

    let answer = s
        .process_query("How is the grid?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(answer, "Grid is stable.");
    assert!(tools.calls().is_empty());

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.temperature, TEMPERATURE);
    assert_eq!(req.max_output_tokens, 2000);
    assert_eq!(req.tools.as_ref().unwrap().as_array().unwrap().len(), 3);

    assert_eq!(req.messages.len(), 3);
    assert_eq!(req.messages[0].role, Role::System);
    assert!(req.messages[0]
        .text()
        .ends_with("Provide concise, actionable insights for grid operators."));
    assert!(req.messages[1]
        .text()
        .starts_with("Additional context: Current operational context: {"));
    assert_eq!(req.messages[2], Message::user("How is the grid?"));

    assert_eq!(s.history().len(), 2);
    assert_eq!(s.history()[1].text(), "Grid is stable.");
}

#[tokio::test]
async fn load_trend_analysis_records_one_analysis() {
    let model = ScriptedModel::new(vec![
        tool_response(json!([call(
            "call_1",
            "analyze_load_pattern",
            "{\"region\":\"Northeast\",\"window_hours\":48}"
        )])),
        text_response("Evening peaks are rising in the Northeast."),
    ]);
    let tools = Arc::new(FakeTools::default().with(
        "analyze_load_pattern",
        Outcome::Ok(json!({"max_load": "65,000 MW", "trend": "increasing evening peaks"})),
    ));
    let mut s = session(model.clone(), tools.clone());

    let answer = s
        .process_query("What load patterns emerged in the Northeast?", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer, "Evening peaks are rising in the Northeast.");

    let analyses = &s.context().analyses;
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].tool, "analyze_load_pattern");
    assert_eq!(analyses[0].args, json!({"region": "Northeast", "window_hours": 48}));
    assert_eq!(analyses[0].result["trend"], "increasing evening peaks");

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].tools.is_none());
    let followup = &requests[1].messages;
    let assistant = &followup[followup.len() - 2];
    assert_eq!(assistant.role, Role::Assistant);
    assert_eq!(assistant.tool_calls()[0].id, "call_1");
    let tool_msg = followup.last().unwrap();
    assert_eq!(tool_msg.role, Role::Tool);
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    let payload: Value = serde_json::from_str(tool_msg.text()).unwrap();
    assert_eq!(payload["max_load"], "65,000 MW");

    let roles: Vec<_> = s.history().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
}

#[tokio::test]
async fn malformed_arguments_are_dispatched_as_raw_input() {
    let model = ScriptedModel::new(vec![
        tool_response(json!([call("call_1", "get_grid_topology", "{bad json")])),
        text_response("Could not read the region."),
    ]);
    let tools = Arc::new(
        FakeTools::default().with("get_grid_topology", Outcome::Ok(json!({"error": "bad input"}))),
    );
    let mut s = session(model, tools.clone());

    let answer = s
        .process_query("Show Northeast topology", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer, "Could not read the region.");

    let calls = tools.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, json!({"raw_input": "{bad json"}));
    assert!(s.context().regions.is_empty());
}

#[tokio::test]
async fn failed_tool_call_is_dropped() {
    let model = ScriptedModel::new(vec![
        tool_response(json!([
            call("call_ok", "get_grid_topology", "{\"region\":\"West\"}"),
            call("call_bad", "get_equipment_status", "{\"equipment_id\":\"T-9\"}")
        ])),
        text_response("West topology retrieved; equipment status unavailable."),
    ]);
    let tools = Arc::new(
        FakeTools::default()
            .with("get_grid_topology", Outcome::Ok(json!({"substations": 12})))
            .with("get_equipment_status", Outcome::Fail),
    );
    let mut s = session(model.clone(), tools.clone());

    s.process_query("Status of the West?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tools.calls().len(), 2);
    assert!(s.context().regions.contains("West"));
    assert!(s.context().equipment.is_empty());

    let followup = &model.requests()[1].messages;
    let tool_msgs: Vec<_> = followup.iter().filter(|m| m.role == Role::Tool).collect();
    assert_eq!(tool_msgs.len(), 1);
    assert_eq!(tool_msgs[0].tool_call_id.as_deref(), Some("call_ok"));
}

#[tokio::test]
async fn invalid_model_fails_before_any_call() {
    let model = ScriptedModel::new(vec![text_response("unused")]);
    let mut s = Session::new(
        ModelIdentifier::new(Provider::OpenAi, "gpt-5-ultra"),
        model.clone(),
        Arc::new(FakeTools::default()),
    );

    let err = s
        .process_query("hello", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::InvalidModel(_)));
    assert!(model.requests().is_empty());
    assert!(s.history().is_empty());
}

#[tokio::test]
async fn change_model_applies_to_both_calls_and_keeps_history() {
    let model = ScriptedModel::new(vec![
        text_response("first answer"),
        tool_response(json!([call("call_1", "get_grid_topology", "{\"region\":\"North\"}")])),
        text_response("second answer"),
    ]);
    let tools = Arc::new(FakeTools::default().with("get_grid_topology", Outcome::Ok(json!({}))));
    let mut s = session(model.clone(), tools);
    let cancel = CancellationToken::new();

    s.process_query("first", &cancel).await.unwrap();
    assert!(matches!(
        s.change_model("mistral:gpt-4o"),
        Err(AiError::InvalidModel(_))
    ));
    assert_eq!(s.model().to_string(), "openai:gpt-4o");

    s.change_model("mistral:mistral-large-latest").unwrap();
    assert_eq!(s.history().len(), 2);

    s.process_query("second", &cancel).await.unwrap();

    let requests = model.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].model.provider, Provider::OpenAi);
    for req in &requests[1..] {
        assert_eq!(req.model.to_string(), "mistral:mistral-large-latest");
    }
    // Mistral collapses the prompt instead of appending guidance.
    assert_eq!(
        requests[1].messages[0].text(),
        "You are a Grid Operations Assistant."
    );
    // Prior turn is replayed.
    assert_eq!(requests[1].messages[1], Message::user("first"));
}

#[tokio::test]
async fn context_snapshot_is_taken_before_the_turn() {
    let model = ScriptedModel::new(vec![
        tool_response(json!([call("call_1", "get_grid_topology", "{\"region\":\"South\"}")])),
        text_response("done"),
        text_response("again"),
    ]);
    let tools = Arc::new(FakeTools::default().with("get_grid_topology", Outcome::Ok(json!({}))));
    let mut s = session(model.clone(), tools);
    let cancel = CancellationToken::new();

    s.process_query("q1", &cancel).await.unwrap();
    s.process_query("q2", &cancel).await.unwrap();

    let requests = model.requests();
    let context_of = |req: &ModelRequest| {
        req.messages
            .iter()
            .find(|m| m.text().starts_with("Additional context"))
            .map(|m| m.text().to_string())
            .unwrap()
    };
    assert!(!context_of(&requests[0]).contains("South"));
    assert!(context_of(&requests[2]).contains("South"));
}

#[tokio::test]
async fn history_policy_limits_replayed_messages() {
    let responses = (0..4).map(|i| text_response(&format!("a{i}"))).collect();
    let model = ScriptedModel::new(responses);
    let mut s = session(model.clone(), Arc::new(FakeTools::default()))
        .with_history_policy(policy_for_limit(3));
    let cancel = CancellationToken::new();

    for i in 0..4 {
        s.process_query(&format!("q{i}"), &cancel).await.unwrap();
    }

    assert_eq!(s.history().len(), 8);
    let last = &model.requests()[3].messages;
    // system + (first + 2 latest) + context + query
    assert_eq!(last.len(), 6);
    assert_eq!(last[1].text(), "q0");
    assert_eq!(last[2].text(), "q2");
    assert_eq!(last[3].text(), "a2");
}

#[tokio::test]
async fn cancellation_during_tools_rolls_back_turn() {
    let cancel = CancellationToken::new();
    let model = ScriptedModel::new(vec![
        text_response("kept"),
        tool_response(json!([
            call("call_1", "get_grid_topology", "{\"region\":\"East\"}"),
            call("call_2", "analyze_load_pattern", "{\"region\":\"East\"}")
        ])),
    ]);
    let tools = Arc::new(
        FakeTools::default()
            .with("get_grid_topology", Outcome::Ok(json!({})))
            .with("analyze_load_pattern", Outcome::CancelThenHang(cancel.clone())),
    );
    let mut s = session(model, tools);

    s.process_query("warm up", &CancellationToken::new())
        .await
        .unwrap();
    let err = s.process_query("analyze East", &cancel).await.unwrap_err();

    assert!(matches!(err, AiError::Cancelled));
    assert_eq!(s.history().len(), 2);
    assert_eq!(s.history()[1].text(), "kept");
    assert!(s.context().regions.is_empty());
    assert!(s.context().analyses.is_empty());
}

#[tokio::test]
async fn already_cancelled_token_changes_nothing() {
    let model = ScriptedModel::new(vec![text_response("unused")]);
    let mut s = session(model.clone(), Arc::new(FakeTools::default()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = s.process_query("q", &cancel).await.unwrap_err();
    assert!(matches!(err, AiError::Cancelled));
    assert!(model.requests().is_empty());
    assert!(s.history().is_empty());
}

#[tokio::test]
async fn second_call_failure_keeps_context() {
    let model = ScriptedModel::new(vec![
        tool_response(json!([call("call_1", "get_equipment_status", "{\"equipment_id\":\"T-7\"}")])),
        Err(AiError::ModelUnavailable("HTTP 503".into())),
    ]);
    let tools = Arc::new(
        FakeTools::default().with("get_equipment_status", Outcome::Ok(json!({"status": "online"}))),
    );
    let mut s = session(model, tools);

    let err = s
        .process_query("Status of T-7?", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AiError::ModelUnavailable(_)));
    assert!(s.context().equipment.contains("T-7"));
    assert_eq!(s.history().len(), 2);
}

#[tokio::test]
async fn model_timeout_is_unavailable() {
    let model = ScriptedModel::slow(Duration::from_secs(5));
    let mut s = session(model, Arc::new(FakeTools::default()))
        .with_model_timeout(Duration::from_millis(20));

    let err = s
        .process_query("q", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::ModelUnavailable(ref m) if m.contains("no response")));
    assert!(s.history().is_empty());
}

#[tokio::test]
async fn tool_timeout_drops_the_call() {
    let model = ScriptedModel::new(vec![
        tool_response(json!([
            call("call_slow", "get_equipment_status", "{\"equipment_id\":\"T-1\"}"),
            call("call_fast", "get_grid_topology", "{\"region\":\"North\"}")
        ])),
        text_response("partial answer"),
    ]);
    let tools = Arc::new(
        FakeTools::default()
            .with("get_equipment_status", Outcome::Hang)
            .with("get_grid_topology", Outcome::Ok(json!({}))),
    );
    let mut s = session(model.clone(), tools).with_tool_timeout(Duration::from_millis(20));

    let answer = s
        .process_query("status", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer, "partial answer");
    assert!(s.context().equipment.is_empty());
    assert!(s.context().regions.contains("North"));

    let followup = &model.requests()[1].messages;
    let ids: Vec<_> = followup
        .iter()
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["call_fast"]);
}

#[tokio::test]
async fn empty_tool_list_sends_no_tools() {
    let model = ScriptedModel::new(vec![text_response("ok")]);
    let mut s = Session::new(
        ModelIdentifier::new(Provider::Google, "gemini-1.5-pro"),
        model.clone(),
        Arc::new(FakeTools::default()),
    );
    // Gemini-shaped response is needed for the google adapter.
    *model.responses.lock().unwrap() = VecDeque::from(vec![Ok(json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": "ok"}]}}]
    }))]);

    let answer = s.process_query("q", &CancellationToken::new()).await.unwrap();
    assert_eq!(answer, "ok");
    assert!(model.requests()[0].tools.is_none());
}

#[tokio::test]
async fn every_tool_call_failing_still_answers() {
    let model = ScriptedModel::new(vec![
        tool_response(json!([call("call_bad", "get_equipment_status", "{\"equipment_id\":\"T-9\"}")])),
        text_response("Equipment status is unavailable right now."),
        text_response("Nothing new."),
    ]);
    let tools = Arc::new(FakeTools::default().with("get_equipment_status", Outcome::Fail));
    let mut s = session(model.clone(), tools);
    let cancel = CancellationToken::new();

    let answer = s.process_query("Status of T-9?", &cancel).await.unwrap();
    assert_eq!(answer, "Equipment status is unavailable right now.");
    assert!(s.context().equipment.is_empty());

    s.process_query("Anything else?", &cancel).await.unwrap();

    let requests = model.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1].messages.iter().all(|m| m.role != Role::Tool));

    // Neither the follow-up nor the next query may carry an assistant
    // message with no content and no calls.
    for req in &requests[1..] {
        let body = build_request_body(req);
        for msg in body["messages"].as_array().unwrap() {
            if msg["role"] == "assistant" {
                assert!(msg["content"].is_string() || msg.get("tool_calls").is_some(), "{msg}");
            }
        }
    }
}

#[tokio::test]
async fn anthropic_tool_turn_renders_valid_bodies() {
    let model = ScriptedModel::new(vec![
        Ok(json!({
            "content": [{"type": "tool_use", "id": "toolu_1", "name": "get_grid_topology",
                         "input": {"region": "West"}}],
            "stop_reason": "tool_use"
        })),
        Ok(json!({"content": [{"type": "text", "text": "West has 12 substations."}]})),
        Ok(json!({"content": [{"type": "text", "text": "Still 12."}]})),
    ]);
    let tools = Arc::new(
        FakeTools::default().with("get_grid_topology", Outcome::Ok(json!({"substations": 12}))),
    );
    let mut s = session_on(
        ModelIdentifier::new(Provider::Anthropic, "claude-3-5-sonnet-20241022"),
        model.clone(),
        tools,
    );
    let cancel = CancellationToken::new();

    let answer = s.process_query("West topology?", &cancel).await.unwrap();
    assert_eq!(answer, "West has 12 substations.");
    assert!(s.context().regions.contains("West"));

    s.process_query("Has it changed?", &cancel).await.unwrap();

    let requests = model.requests();
    let first = build_request_body(&requests[0]);
    assert_eq!(first["tools"].as_array().unwrap().len(), 3);

    let followup = build_request_body(&requests[1]);
    assert!(followup.get("tools").is_none());
    let followup_blocks = blocks(&followup, "messages", "content");
    assert!(followup_blocks.iter().all(|b| b["type"] == "text"));
    assert!(followup_blocks
        .iter()
        .any(|b| b["text"] == "Result for toolu_1: {\"substations\":12}"));

    // With tools declared again, replayed history is structured.
    let next = build_request_body(&requests[2]);
    let next_blocks = blocks(&next, "messages", "content");
    assert!(next_blocks
        .iter()
        .any(|b| b["type"] == "tool_use" && b["id"] == "toolu_1"));
    assert!(next_blocks
        .iter()
        .any(|b| b["type"] == "tool_result" && b["tool_use_id"] == "toolu_1"));
}

#[tokio::test]
async fn google_tool_turn_renders_valid_bodies() {
    let model = ScriptedModel::new(vec![
        Ok(json!({"candidates": [{"content": {"role": "model", "parts": [
            {"functionCall": {"name": "get_grid_load_data", "args": {"dataset_id": "ne-48h"}}}
        ]}}]})),
        Ok(json!({"candidates": [{"content": {"role": "model", "parts": [
            {"text": "Peak load was 65,000 MW."}
        ]}}]})),
    ]);
    let tools = Arc::new(
        FakeTools::default().with("get_grid_load_data", Outcome::Ok(json!({"peak": 65000}))),
    );
    let mut s = session_on(
        ModelIdentifier::new(Provider::Google, "gemini-1.5-pro"),
        model.clone(),
        tools,
    );

    let answer = s
        .process_query("Northeast load?", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer, "Peak load was 65,000 MW.");
    assert!(s.context().datasets.contains("ne-48h"));

    let requests = model.requests();
    let first = build_request_body(&requests[0]);
    assert_eq!(first["tools"].as_array().unwrap().len(), 3);

    let followup = build_request_body(&requests[1]);
    assert!(followup.get("tools").is_none());
    let parts = blocks(&followup, "contents", "parts");
    assert!(parts
        .iter()
        .all(|p| p.get("functionCall").is_none() && p.get("functionResponse").is_none()));
    assert!(parts
        .iter()
        .any(|p| p["text"] == "Result for get_grid_load_data: {\"peak\":65000}"));
}

#[test]
fn sessions_have_distinct_ids_and_expose_tools() {
    let a = session(ScriptedModel::new(vec![]), Arc::new(FakeTools::default()));
    let b = session(ScriptedModel::new(vec![]), Arc::new(FakeTools::default()));
    assert_ne!(a.id(), b.id());

    let names: Vec<_> = a.tools().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["get_grid_topology", "get_equipment_status", "analyze_load_pattern"]
    );
}
