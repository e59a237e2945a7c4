//! Canonical `{output|error|raw}` result envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::default::GREETING;

/// Phrases that mark a plain-string result as a failure
const FAILURE_MARKERS: &[&str] = &["failed to parse json", "not sure"];

pub const NO_OUTPUT: &str = "No output.";

/// Exactly one of `output`, `error` or `raw`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultEnvelope {
    Output(Value),
    Error(String),
    Raw(String),
}

impl ResultEnvelope {
    pub fn is_error(&self) -> bool {
        matches!(self, ResultEnvelope::Error(_))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Null)
    }

    /// Plain text for console presentation
    pub fn text(&self) -> String {
        match self {
            ResultEnvelope::Output(Value::String(s)) => s.clone(),
            ResultEnvelope::Output(other) => {
                serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
            }
            ResultEnvelope::Error(e) => e.clone(),
            ResultEnvelope::Raw(r) => r.clone(),
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_map(map: &Map<String, Value>) -> ResultEnvelope {
    if let Some(error) = map.get("error") {
        return ResultEnvelope::Error(stringify(error));
    }
    if let Some(output) = ["output", "message", "text"]
        .iter()
        .find_map(|key| map.get(*key))
    {
        return ResultEnvelope::Output(output.clone());
    }
    match map.get("raw") {
        Some(raw) => ResultEnvelope::Raw(stringify(raw)),
        None => ResultEnvelope::Raw(Value::Object(map.clone()).to_string()),
    }
}

fn normalize_str(text: &str) -> ResultEnvelope {
    // legacy: some tools report success as the literal string "True"
    if text == "True" {
        return ResultEnvelope::Output(Value::String(GREETING.to_string()));
    }
    let lowered = text.to_lowercase();
    if FAILURE_MARKERS.iter().any(|m| lowered.contains(m)) {
        ResultEnvelope::Error(text.to_string())
    } else {
        ResultEnvelope::Output(Value::String(text.to_string()))
    }
}

/// Map an arbitrary tool or plan result onto the envelope.
///
/// Applying it to an already-normalized envelope (as JSON) is a no-op.
pub fn normalize(raw: &Value) -> ResultEnvelope {
    match raw {
        Value::Object(map) => normalize_map(map),
        Value::String(text) => normalize_str(text),
        Value::Null | Value::Bool(false) => ResultEnvelope::Error(NO_OUTPUT.to_string()),
        Value::Bool(true) => ResultEnvelope::Output(Value::String(GREETING.to_string())),
        other => ResultEnvelope::Raw(other.to_string()),
    }
}
