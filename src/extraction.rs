//! Turning free-form LLM text into an executable command.
//!
//! The text is expected to carry one of four JSON envelopes, keyed by
//! `command`, `file_operation`, `info_type` or `error` (checked in that
//! order).

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorCategory, ErrorReport};

/// Confidence attached to every structurally successful parse
pub const CONFIDENCE: f64 = 0.9;

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap();
}

/// Locate the JSON payload in `text`: a fenced ```json block if present,
/// else everything from the first `{` to the last `}`.
pub fn locate_json(text: &str) -> Option<&str> {
    if let Some(captures) = FENCED_JSON.captures(text) {
        if let Some(body) = captures.get(1) {
            return Some(body.as_str());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Replace every `'` so the value can sit inside a single-quoted shell literal
pub fn escape_single_quotes(content: &str) -> String {
    content.replace('\'', r"'\''")
}

/// Which envelope the payload carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    Command,
    FileOperation,
    InfoType,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub kind: Option<EnvelopeKind>,
    pub confidence: Option<f64>,
    pub explanation: Option<Value>,
    pub alternatives: Option<Value>,
    pub is_error: bool,
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    /// Remediation hints for `error_message`
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub suggested_approach: Option<String>,
    pub info_type: Option<String>,
    pub information: Option<Value>,
    /// Verbatim input, kept for retries and debugging
    pub raw_text: String,
}

impl ExtractionMetadata {
    /// The error as a user-facing report; `None` unless `is_error`
    pub fn report(&self) -> Option<ErrorReport> {
        if !self.is_error {
            return None;
        }
        let category = self.error_category.unwrap_or(ErrorCategory::AiResponse);
        Some(ErrorReport {
            category,
            message: self
                .error_message
                .clone()
                .unwrap_or_else(|| ErrorReport::new(category, "no command found").message),
            suggestions: self.suggestions.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub success: bool,
    pub command: Option<String>,
    pub metadata: ExtractionMetadata,
}

impl Extraction {
    fn succeeded(command: String, metadata: ExtractionMetadata) -> Self {
        Self {
            success: true,
            command: Some(command),
            metadata,
        }
    }

    fn declined(metadata: ExtractionMetadata) -> Self {
        Self {
            success: false,
            command: None,
            metadata,
        }
    }

    fn failed(mut metadata: ExtractionMetadata, report: ErrorReport) -> Self {
        metadata.is_error = true;
        metadata.error_category = Some(report.category);
        metadata.error_message = Some(report.message);
        metadata.suggestions = report.suggestions;
        Self::declined(metadata)
    }
}

/// Parses LLM responses into shell commands
#[derive(Debug, Clone, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, ai_text: &str) -> Extraction {
        let mut metadata = ExtractionMetadata {
            raw_text: ai_text.to_string(),
            ..ExtractionMetadata::default()
        };

        let Some(json_text) = locate_json(ai_text) else {
            return Extraction::failed(
                metadata,
                ErrorReport::new(ErrorCategory::JsonParsing, "no JSON object found in response"),
            );
        };

        let data: Value = match serde_json::from_str(json_text) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("AI response is not valid JSON: {}", e);
                return Extraction::failed(
                    metadata,
                    ErrorReport::new(ErrorCategory::JsonParsing, e.to_string()),
                );
            }
        };

        let Value::Object(data) = data else {
            return Extraction::failed(
                metadata,
                ErrorReport::new(ErrorCategory::AiResponse, "unexpected data structure"),
            );
        };

        if let Some(command) = data.get("command") {
            metadata.kind = Some(EnvelopeKind::Command);
            metadata.confidence = Some(CONFIDENCE);
            metadata.explanation = data.get("explanation").cloned();
            metadata.alternatives = data.get("alternatives").cloned();
            return match command.as_str() {
                Some(command) if !command.trim().is_empty() => {
                    Extraction::succeeded(command.to_string(), metadata)
                }
                _ => Extraction::failed(
                    metadata,
                    ErrorReport::new(ErrorCategory::AiResponse, "'command' must be a non-empty string"),
                ),
            };
        }

        if let Some(operation) = data.get("file_operation") {
            metadata.kind = Some(EnvelopeKind::FileOperation);
            metadata.confidence = Some(CONFIDENCE);
            metadata.explanation = data.get("explanation").cloned();
            let empty = Map::new();
            let params = data
                .get("operation_params")
                .and_then(Value::as_object)
                .unwrap_or(&empty);

            return match operation
                .as_str()
                .ok_or_else(|| "'file_operation' must be a string".to_string())
                .and_then(|op| file_command(op, params))
            {
                Ok(command) => Extraction::succeeded(command, metadata),
                Err(detail) => Extraction::failed(
                    metadata,
                    ErrorReport::new(ErrorCategory::FileOperation, detail),
                ),
            };
        }

        if let Some(info_type) = data.get("info_type") {
            metadata.kind = Some(EnvelopeKind::InfoType);
            metadata.confidence = Some(CONFIDENCE);
            metadata.info_type = Some(match info_type {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            metadata.information = data.get("information").cloned();
            return match data.get("related_command").and_then(Value::as_str) {
                Some(command) if !command.trim().is_empty() => {
                    Extraction::succeeded(command.to_string(), metadata)
                }
                _ => Extraction::declined(metadata),
            };
        }

        if data.get("error").is_some_and(is_truthy) {
            metadata.kind = Some(EnvelopeKind::Error);
            metadata.confidence = Some(CONFIDENCE);
            metadata.is_error = true;
            metadata.error_message = Some(
                data.get("error_message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        ErrorReport::new(ErrorCategory::AiResponse, "the model reported an error")
                            .message
                    }),
            );
            metadata.suggested_approach = data
                .get("suggested_approach")
                .and_then(Value::as_str)
                .map(str::to_string);
            metadata.error_category = Some(ErrorCategory::AiResponse);
            metadata.suggestions = match &metadata.suggested_approach {
                Some(approach) => vec![approach.clone()],
                None => ErrorReport::new(ErrorCategory::AiResponse, "").suggestions,
            };
            return Extraction::declined(metadata);
        }

        Extraction::failed(
            metadata,
            ErrorReport::new(ErrorCategory::AiResponse, "unexpected data structure"),
        )
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn param<'a>(params: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| params.get(*key).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

/// A single-quoted shell literal
fn quoted(value: &str) -> String {
    format!("'{}'", escape_single_quotes(value))
}

/// Synthesize the shell command equivalent to a file operation.
/// Missing required parameters are an error, never a partial command.
/// Every path and content value is passed as a single-quoted literal.
pub fn file_command(operation: &str, params: &Map<String, Value>) -> Result<String, String> {
    let filename = || {
        param(params, &["filename", "file"])
            .map(quoted)
            .ok_or_else(|| format!("'{}' requires a filename", operation))
    };
    let content = param(params, &["content"]);
    let directory = quoted(param(params, &["directory", "path"]).unwrap_or("."));

    match operation {
        "create" => {
            let file = filename()?;
            Ok(match content {
                Some(content) => format!("echo {} > {}", quoted(content), file),
                None => format!("touch {}", file),
            })
        }
        "write" | "append" => {
            let file = filename()?;
            let content = content.ok_or_else(|| format!("'{}' requires content", operation))?;
            let redirect = if operation == "append" { ">>" } else { ">" };
            Ok(format!("echo {} {} {}", quoted(content), redirect, file))
        }
        "read" => Ok(format!("cat {}", filename()?)),
        "delete" => {
            let file = filename()?;
            let force = params.get("force").is_some_and(is_truthy);
            Ok(if force {
                format!("rm -f {}", file)
            } else {
                format!("rm {}", file)
            })
        }
        "search" => {
            let term = param(params, &["search_term", "pattern", "term"])
                .ok_or_else(|| "'search' requires a search_term".to_string())?;
            Ok(format!(
                "find {} -name '*{}*'",
                directory,
                escape_single_quotes(term)
            ))
        }
        "list" => Ok(format!("ls -la {}", directory)),
        other => Err(format!("unsupported file operation '{}'", other)),
    }
}
