use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use std::process::Stdio;
use tokio::process::Command;

use super::{Tool, ToolContext, DEFAULT_ACTION};
use crate::error::{ErrorCategory, ToolError};

pub struct ShellTool;

#[derive(Debug, Deserialize)]
struct ShellParams {
    command: String,
    #[serde(default)]
    timeout: Option<u64>,
}

/// Result of checking a command for dangerous patterns
#[derive(Debug)]
struct DangerCheck {
    is_dangerous: bool,
    matched_patterns: Vec<String>,
}

impl ShellTool {
    /// Check if a command matches any dangerous patterns
    fn check_dangerous_command(command: &str, patterns: &[String]) -> DangerCheck {
        let mut matched = Vec::new();

        for pattern in patterns {
            if let Ok(re) = Regex::new(pattern) {
                if re.is_match(command) {
                    matched.push(pattern.clone());
                }
            }
        }

        DangerCheck {
            is_dangerous: !matched.is_empty(),
            matched_patterns: matched,
        }
    }

    /// Truncate output if it exceeds the maximum size
    fn truncate_output(output: String, max_bytes: usize) -> String {
        if output.len() <= max_bytes {
            return output;
        }

        let mut safe_end = max_bytes;
        while !output.is_char_boundary(safe_end) {
            safe_end -= 1;
        }

        let mut result = output[..safe_end].to_string();
        result.push_str(&format!(
            "\n\n[OUTPUT TRUNCATED: {} bytes omitted, limit is {} bytes]",
            output.len() - safe_end,
            max_bytes
        ));
        result
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Executes a shell command in the working directory and returns its output."
    }

    fn command_help(&self, command: &str) -> Option<String> {
        (command == DEFAULT_ACTION)
            .then(|| "shell execute command=<text> [timeout=<secs>]".to_string())
    }

    async fn execute(
        &self,
        action: &str,
        params: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        self.validate_command(action, &params)?;
        let params: ShellParams = serde_json::from_value(Value::Object(params))
            .map_err(|e| ToolError::invalid_params("shell", e))?;

        if ctx.config.warn_dangerous_commands {
            let danger_check =
                Self::check_dangerous_command(&params.command, &ctx.config.dangerous_patterns);

            if danger_check.is_dangerous {
                return Err(ToolError::Blocked(format!(
                    "Command '{}' matches dangerous patterns: {}",
                    params.command,
                    danger_check.matched_patterns.join(", ")
                )));
            }
        }

        // Use config timeout as default, allow override from params
        let timeout_secs = params.timeout.unwrap_or(ctx.config.shell_timeout_secs);
        let timeout = tokio::time::Duration::from_secs(timeout_secs);

        tracing::debug!(
            "Executing shell command with {}s timeout: {}",
            timeout_secs,
            &params.command
        );

        let child = Command::new("sh")
            .arg("-c")
            .arg(&params.command)
            .current_dir(ctx.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn command")
            .map_err(command_error)?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result
                .context("Failed to wait for process")
                .map_err(command_error)?,
            Err(_) => {
                tracing::warn!(
                    "Command timed out after {}s: {}",
                    timeout_secs,
                    &params.command
                );
                return Err(command_error(anyhow::anyhow!(
                    "Command '{}' timed out after {} seconds",
                    params.command,
                    timeout_secs
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(command_error(anyhow::anyhow!(
                "Command exited with {}: {}",
                output.status,
                detail
            )));
        }

        let mut combined = stdout.into_owned();
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        Ok(Value::String(Self::truncate_output(
            combined,
            ctx.config.max_output_bytes,
        )))
    }
}

fn command_error(error: anyhow::Error) -> ToolError {
    ToolError::classified(ErrorCategory::SystemCommand, error)
}
