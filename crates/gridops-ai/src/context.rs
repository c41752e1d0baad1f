//! Operational context accumulated across a session's tool calls.

use std::collections::VecDeque;

use chrono::{SecondsFormat, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

const ANALYTICS_TOOLS: [&str; 3] = [
    "analyze_load_pattern",
    "predict_outage_risk",
    "generate_grid_visualization",
];

/// Entities seen so far. The three sets keep first-seen order and never hold
/// duplicates; `analyses` is append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationalContext {
    pub datasets: IndexSet<String>,
    pub equipment: IndexSet<String>,
    pub regions: IndexSet<String>,
    pub analyses: VecDeque<AnalysisRecord>,
}

/// One analytics tool invocation and what it returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub tool: String,
    pub args: Value,
    /// UTC, RFC 3339.
    pub timestamp: String,
    pub result: Value,
}

/// Folds successful tool results into an [`OperationalContext`].
#[derive(Debug, Clone, Default)]
pub struct OperationalContextTracker {
    context: OperationalContext,
    /// 0 keeps every analysis.
    max_analyses: usize,
}

impl OperationalContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max` analyses, evicting the oldest. 0 means unbounded.
    pub fn with_max_analyses(mut self, max: usize) -> Self {
        self.max_analyses = max;
        self
    }

    /// Record one successful tool call. Unrecognized tools leave the context
    /// unchanged.
    pub fn apply(&mut self, tool: &str, args: &Value, result: &Value) {
        match tool {
            "get_grid_topology" => {
                insert_arg(&mut self.context.regions, args, &["region"], tool);
            }
            "get_grid_load_data" => {
                insert_arg(
                    &mut self.context.datasets,
                    args,
                    &["dataset_id", "datasetId"],
                    tool,
                );
            }
            "get_equipment_status" => {
                insert_arg(
                    &mut self.context.equipment,
                    args,
                    &["equipment_id", "equipmentId"],
                    tool,
                );
            }
            t if ANALYTICS_TOOLS.contains(&t) => self.push_analysis(tool, args, result),
            _ => debug!(tool = %tool, "tool does not affect operational context"),
        }
    }

    fn push_analysis(&mut self, tool: &str, args: &Value, result: &Value) {
        self.context.analyses.push_back(AnalysisRecord {
            tool: tool.to_string(),
            args: args.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            result: normalize_result(result),
        });
        if self.max_analyses > 0 {
            while self.context.analyses.len() > self.max_analyses {
                self.context.analyses.pop_front();
            }
        }
    }

    pub fn snapshot(&self) -> &OperationalContext {
        &self.context
    }

    /// Replace the context wholesale, e.g. to undo a cancelled turn.
    pub fn restore(&mut self, context: OperationalContext) {
        self.context = context;
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.context)
    }
}

fn insert_arg(set: &mut IndexSet<String>, args: &Value, keys: &[&str], tool: &str) {
    let value = keys.iter().find_map(|k| args.get(*k));
    let entry = match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            debug!(tool = %tool, value = %other, "ignoring non-scalar context key");
            return;
        }
        None => return,
    };
    set.insert(entry);
}

/// Text results are parsed as JSON when possible, else wrapped as
/// `{"raw_result": text}`.
fn normalize_result(result: &Value) -> Value {
    match result {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            warn!(error = %e, "tool result is not JSON, storing raw text");
            json!({ "raw_result": text })
        }),
        other => other.clone(),
    }
}
