use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::process::Stdio;
use tokio::process::Command;

use super::{require_str, DispatcherTool, ToolContext};
use crate::error::ToolError;

/// Starts a named desktop application without waiting for it
pub struct LauncherTool;

impl LauncherTool {
    fn command_for(app: &str) -> Command {
        let mut command = if cfg!(target_os = "macos") {
            let mut c = Command::new("open");
            c.arg("-a").arg(app);
            c
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", "", app]);
            c
        } else {
            Command::new(app)
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

#[async_trait]
impl DispatcherTool for LauncherTool {
    fn name(&self) -> &str {
        "launcher"
    }

    fn description(&self) -> &str {
        "Opens a named application."
    }

    fn actions(&self) -> &[&'static str] {
        &["open"]
    }

    async fn dispatch(
        &self,
        _action: &str,
        args: Map<String, Value>,
        _ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        let app = require_str("launcher", &args, "app")?;
        Self::command_for(app)
            .spawn()
            .with_context(|| format!("Failed to launch {}", app))?;
        tracing::info!("Launched {}", app);
        Ok(json!(format!("Opening {}", app)))
    }
}
