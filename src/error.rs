//! Error taxonomy and typed error surfaces.
//!
//! Internal code uses `anyhow::Result` for context chains; the enums here
//! are what callers match on. `ErrorReport` attaches a category template
//! and remediation suggestions at formatting time.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of everything that can go wrong in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    CommandParsing,
    AiResponse,
    JsonParsing,
    FileOperation,
    SystemCommand,
    Security,
    Network,
    Platform,
    Permission,
    UserInput,
    Internal,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::CommandParsing => "command-parsing",
            ErrorCategory::AiResponse => "ai-response",
            ErrorCategory::JsonParsing => "json-parsing",
            ErrorCategory::FileOperation => "file-operation",
            ErrorCategory::SystemCommand => "system-command",
            ErrorCategory::Security => "security",
            ErrorCategory::Network => "network",
            ErrorCategory::Platform => "platform",
            ErrorCategory::Permission => "permission",
            ErrorCategory::UserInput => "user-input",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Message template; `{detail}` is replaced by the caller's detail
    pub fn template(&self) -> &'static str {
        match self {
            ErrorCategory::CommandParsing => "Could not parse command: {detail}",
            ErrorCategory::AiResponse => "Unusable AI response: {detail}",
            ErrorCategory::JsonParsing => "Failed to parse JSON: {detail}",
            ErrorCategory::FileOperation => "File operation failed: {detail}",
            ErrorCategory::SystemCommand => "System command failed: {detail}",
            ErrorCategory::Security => "Blocked for safety: {detail}",
            ErrorCategory::Network => "Network request failed: {detail}",
            ErrorCategory::Platform => "Not supported on this platform: {detail}",
            ErrorCategory::Permission => "Permission denied: {detail}",
            ErrorCategory::UserInput => "Invalid input: {detail}",
            ErrorCategory::Internal => "Internal error: {detail}",
            ErrorCategory::Unknown => "Unexpected error: {detail}",
        }
    }

    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            ErrorCategory::CommandParsing => &[
                "Rephrase the command using a simple verb and object",
                "Split long requests with 'and' or 'then'",
            ],
            ErrorCategory::AiResponse => &["Ask again; the model may answer with a usable command"],
            ErrorCategory::JsonParsing => &[
                "Make sure the response contains a single JSON object",
                "Prefer a fenced ```json block",
            ],
            ErrorCategory::FileOperation => &[
                "Check that the file exists and the path is relative to the working directory",
            ],
            ErrorCategory::SystemCommand => &["Run the command manually to inspect its output"],
            ErrorCategory::Security => &[
                "Disable warn_dangerous_commands in the [tools] config section if this is intended",
            ],
            ErrorCategory::Network => &["Check the network connection and the configured base URL"],
            ErrorCategory::Platform => &[],
            ErrorCategory::Permission => &["Check file permissions for the working directory"],
            ErrorCategory::UserInput => &["Provide the missing value and try again"],
            ErrorCategory::Internal => &[],
            ErrorCategory::Unknown => &[],
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A formatted, user-facing error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl ErrorReport {
    pub fn new(category: ErrorCategory, detail: impl AsRef<str>) -> Self {
        Self {
            category,
            message: category.template().replace("{detail}", detail.as_ref()),
            suggestions: category
                .suggestions()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn without_suggestions(mut self) -> Self {
        self.suggestions.clear();
        self
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for suggestion in &self.suggestions {
            write!(f, "\n  - {}", suggestion)?;
        }
        Ok(())
    }
}

/// Errors raised by the tool registry and the tools it dispatches to
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown action: {0}")]
    NotFound(String),

    #[error("tool '{tool}' expects a parameter map")]
    TypeMismatch { tool: String },

    #[error("invalid parameters for '{tool}': {reason}")]
    InvalidParams { tool: String, reason: String },

    #[error("tool '{tool}' has no action '{action}'")]
    UnknownAction { tool: String, action: String },

    #[error("{0}")]
    Blocked(String),

    /// A failure whose category is known where it happens
    #[error("{message}")]
    Classified {
        category: ErrorCategory,
        message: String,
    },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ToolError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ToolError::NotFound(_) | ToolError::UnknownAction { .. } => ErrorCategory::UserInput,
            ToolError::TypeMismatch { .. } => ErrorCategory::Internal,
            ToolError::InvalidParams { .. } => ErrorCategory::UserInput,
            ToolError::Blocked(_) => ErrorCategory::Security,
            ToolError::Classified { category, .. } => *category,
            ToolError::Failed(e) => Self::category_of(e),
        }
    }

    /// Classify an untyped failure by the errors in its cause chain
    fn category_of(error: &anyhow::Error) -> ErrorCategory {
        for cause in error.chain() {
            if cause.is::<reqwest::Error>() {
                return ErrorCategory::Network;
            }
            if let Some(io) = cause.downcast_ref::<std::io::Error>() {
                return match io.kind() {
                    std::io::ErrorKind::PermissionDenied => ErrorCategory::Permission,
                    _ => ErrorCategory::FileOperation,
                };
            }
        }
        ErrorCategory::Unknown
    }

    /// Wrap `error` with a fixed category, keeping its whole cause chain in the message
    pub fn classified(category: ErrorCategory, error: anyhow::Error) -> Self {
        ToolError::Classified {
            category,
            message: format!("{:#}", error),
        }
    }

    /// The user-facing report for this error
    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.category(), format!("{:#}", self))
    }

    pub fn invalid_params(tool: &str, reason: impl fmt::Display) -> Self {
        ToolError::InvalidParams {
            tool: tool.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_fills_template() {
        let report = ErrorReport::new(ErrorCategory::JsonParsing, "expected value at line 1");
        assert_eq!(
            report.message,
            "Failed to parse JSON: expected value at line 1"
        );
        assert_eq!(report.suggestions.len(), 2);
    }

    #[test]
    fn test_report_display_lists_suggestions() {
        let rendered = ErrorReport::new(ErrorCategory::UserInput, "missing filename").to_string();
        assert!(rendered.starts_with("Invalid input: missing filename"));
        assert!(rendered.contains("\n  - Provide the missing value"));

        let bare = ErrorReport::new(ErrorCategory::UserInput, "x").without_suggestions();
        assert_eq!(bare.to_string(), "Invalid input: x");
    }

    #[test]
    fn test_tool_error_messages() {
        assert_eq!(
            ToolError::NotFound("teleport".into()).to_string(),
            "Unknown action: teleport"
        );
        let mismatch = ToolError::TypeMismatch {
            tool: "file".into(),
        };
        assert!(mismatch.to_string().contains("'file'"));
        assert_eq!(mismatch.category(), ErrorCategory::Internal);
        assert_eq!(
            ToolError::Blocked("rm -rf /".into()).category(),
            ErrorCategory::Security
        );
    }

    #[test]
    fn test_failed_category_follows_cause_chain() {
        let io = anyhow::Error::new(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ))
        .context("Failed to read notes.txt");
        let err = ToolError::from(io);
        assert_eq!(err.category(), ErrorCategory::FileOperation);
        assert_eq!(format!("{:#}", err), "Failed to read notes.txt: no such file");

        let denied = anyhow::Error::new(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(ToolError::from(denied).category(), ErrorCategory::Permission);

        let plain = ToolError::from(anyhow::anyhow!("exploded"));
        assert_eq!(plain.category(), ErrorCategory::Unknown);
    }

    #[test]
    fn test_classified_keeps_cause_and_suggestions() {
        let cause = anyhow::anyhow!("exit status 2").context("Command failed");
        let err = ToolError::classified(ErrorCategory::SystemCommand, cause);
        assert_eq!(err.to_string(), "Command failed: exit status 2");

        let report = err.report();
        assert_eq!(report.category, ErrorCategory::SystemCommand);
        assert_eq!(report.message, "System command failed: Command failed: exit status 2");
        assert!(report.to_string().contains("\n  - Run the command manually"));
    }

    #[test]
    fn test_category_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorCategory::AiResponse).unwrap();
        assert_eq!(json, "\"ai-response\"");
        assert_eq!(ErrorCategory::FileOperation.to_string(), "file-operation");
    }
}
