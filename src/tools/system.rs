use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::process::Command;

use super::{DispatcherTool, ToolContext};
use crate::error::ToolError;

/// Host information and resource usage
pub struct SystemTool;

impl SystemTool {
    fn info(ctx: &ToolContext<'_>) -> Value {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        json!({
            "os": std::env::consts::OS,
            "family": std::env::consts::FAMILY,
            "arch": std::env::consts::ARCH,
            "cpus": cpus,
            "working_dir": ctx.working_dir.display().to_string(),
        })
    }

    async fn run(program: &str, args: &[&str]) -> Result<Value, ToolError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", program))?;

        if !output.status.success() {
            return Err(ToolError::Failed(anyhow::anyhow!(
                "{} exited with {}",
                program,
                output.status
            )));
        }
        Ok(Value::String(
            String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
        ))
    }
}

#[async_trait]
impl DispatcherTool for SystemTool {
    fn name(&self) -> &str {
        "system"
    }

    fn description(&self) -> &str {
        "Reports system information, disk or memory usage, and running processes."
    }

    fn actions(&self) -> &[&'static str] {
        &["info", "usage", "processes"]
    }

    async fn dispatch(
        &self,
        action: &str,
        args: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        match action {
            "info" => Ok(Self::info(ctx)),
            "usage" => match args.get("resource").and_then(Value::as_str) {
                Some(r) if r.eq_ignore_ascii_case("memory") => {
                    if cfg!(target_os = "linux") {
                        Self::run("free", &["-h"]).await
                    } else {
                        Self::run("vm_stat", &[]).await
                    }
                }
                _ => Self::run("df", &["-h"]).await,
            },
            "processes" => Self::run("ps", &["-e", "-o", "pid,comm"]).await,
            other => Err(ToolError::UnknownAction {
                tool: "system".to_string(),
                action: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;

    #[tokio::test]
    async fn test_info_reports_platform() {
        let config = ToolConfig::default();
        let ctx = ToolContext::from_config(&config);
        let info = SystemTool.dispatch("info", Map::new(), &ctx).await.unwrap();
        assert_eq!(info["os"], std::env::consts::OS);
        assert!(info["cpus"].as_u64().unwrap() >= 1);
    }
}
