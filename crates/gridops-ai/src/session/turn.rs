//! One query: prompt, model call, tool dispatch, second model call.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use gridops_common::TurnId;

use crate::adapter::{format_system_prompt, format_tools, parse_response};
use crate::registry::is_valid_model;
use crate::{AiError, AssistantTurn, Message, ModelRequest, ToolCallResult};

use super::manager::{Session, TEMPERATURE};

/// Why a guarded await did not complete.
enum Interrupted {
    Cancelled,
    TimedOut(Duration),
}

async fn guarded<F: Future>(
    cancel: &CancellationToken,
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output, Interrupted> {
    let bounded = async {
        match limit {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| Interrupted::TimedOut(limit)),
            None => Ok(fut.await),
        }
    };
    tokio::select! {
        _ = cancel.cancelled() => Err(Interrupted::Cancelled),
        out = bounded => out,
    }
}

impl Session {
    /// Answer one operator query.
    ///
    /// Cancelling `cancel` while the turn is in flight returns
    /// [`AiError::Cancelled`] and rolls back this turn's history and context
    /// changes.
    pub async fn process_query(
        &mut self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AiError> {
        let turn_id = TurnId::new();
        let span = info_span!("turn", session = %self.id, turn = %turn_id, model = %self.model);

        let history_mark = self.history.len();
        let context_mark = self.tracker.snapshot().clone();

        let result = self.run_turn(query, cancel).instrument(span).await;
        if matches!(result, Err(AiError::Cancelled)) {
            self.history.truncate(history_mark);
            self.tracker.restore(context_mark);
            info!(turn = %turn_id, "turn cancelled, state rolled back");
        }
        result
    }

    async fn run_turn(&mut self, query: &str, cancel: &CancellationToken) -> Result<String, AiError> {
        if !is_valid_model(&self.model) {
            return Err(AiError::InvalidModel(self.model.to_string()));
        }
        if cancel.is_cancelled() {
            return Err(AiError::Cancelled);
        }

        let provider = self.model.provider;
        let messages = self.build_messages(query)?;
        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(format_tools(&self.tools, provider))
        };

        info!(messages = messages.len(), tools = self.tools.len(), "calling model");
        let first = self.call_model(messages.clone(), tools, cancel).await?;

        let assistant = Message::assistant(first.content.clone(), first.tool_calls.clone());
        self.history.push(Message::user(query));
        self.history.push(assistant.clone());

        if first.tool_calls.is_empty() {
            return Ok(first.content.unwrap_or_default());
        }

        let results = self.dispatch_tools(&first, cancel).await?;
        info!(
            requested = first.tool_calls.len(),
            succeeded = results.len(),
            "tool calls dispatched"
        );

        let tool_messages: Vec<Message> = results
            .iter()
            .map(|r| Message::tool(r.id.clone(), r.payload.to_string()))
            .collect();

        let mut followup = messages;
        followup.push(assistant);
        followup.extend(tool_messages.iter().cloned());

        let second = self.call_model(followup, None, cancel).await?;
        let answer = second.content.unwrap_or_default();

        self.history.extend(tool_messages);
        self.history.push(Message::assistant(Some(answer.clone()), Vec::new()));
        Ok(answer)
    }

    /// System prompt, replayed history, a context snapshot, then the query.
    fn build_messages(&self, query: &str) -> Result<Vec<Message>, AiError> {
        let snapshot = self
            .tracker
            .to_pretty_json()
            .map_err(|e| AiError::ContextSerialization(e.to_string()))?;

        let mut messages = vec![Message::system(format_system_prompt(
            &self.system_prompt,
            self.model.provider,
        ))];
        messages.extend(self.history_policy.view(&self.history));
        messages.push(Message::system(format!(
            "Additional context: Current operational context: {snapshot}"
        )));
        messages.push(Message::user(query));
        Ok(messages)
    }

    async fn call_model(
        &self,
        messages: Vec<Message>,
        tools: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<AssistantTurn, AiError> {
        let request = ModelRequest {
            model: self.model.clone(),
            messages,
            tools,
            temperature: TEMPERATURE,
            max_output_tokens: self.max_output_tokens,
        };

        let raw = match guarded(cancel, self.model_timeout, self.model_service.complete(&request)).await {
            Ok(result) => result?,
            Err(Interrupted::Cancelled) => return Err(AiError::Cancelled),
            Err(Interrupted::TimedOut(limit)) => {
                return Err(AiError::ModelUnavailable(format!(
                    "no response from {} within {limit:?}",
                    self.model
                )))
            }
        };

        let turn = parse_response(&raw, self.model.provider)?;
        debug!(
            has_content = turn.content.is_some(),
            tool_calls = turn.tool_calls.len(),
            "model responded"
        );
        Ok(turn)
    }

    /// Run each requested call in order. Failed calls are logged and
    /// dropped; each success is folded into the context before the next call.
    async fn dispatch_tools(
        &mut self,
        turn: &AssistantTurn,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolCallResult>, AiError> {
        let mut results = Vec::with_capacity(turn.tool_calls.len());

        for call in &turn.tool_calls {
            info!(tool = %call.name, id = %call.id, "executing tool");
            let outcome = guarded(
                cancel,
                self.tool_timeout,
                self.tool_executor.execute(&call.name, &call.arguments),
            )
            .await;

            match outcome {
                Ok(Ok(payload)) => {
                    self.tracker.apply(&call.name, &call.arguments, &payload);
                    results.push(ToolCallResult {
                        id: call.id.clone(),
                        payload,
                    });
                }
                Ok(Err(e)) => warn!(tool = %call.name, error = %e, "tool call failed, dropping"),
                Err(Interrupted::TimedOut(limit)) => {
                    warn!(tool = %call.name, ?limit, "tool call timed out, dropping")
                }
                Err(Interrupted::Cancelled) => return Err(AiError::Cancelled),
            }
        }

        Ok(results)
    }
}
