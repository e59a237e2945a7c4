use async_trait::async_trait;
use chrono::Local;
use serde_json::{Map, Value};

use super::{Tool, ToolContext};
use crate::error::ToolError;

/// Current local date and time
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Reports the current local date and/or time."
    }

    fn available_commands(&self) -> Vec<String> {
        ["now", "date", "time", "execute"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    async fn execute(
        &self,
        action: &str,
        params: Map<String, Value>,
        _ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        self.validate_command(action, &params)?;
        let now = Local::now();
        let text = match action {
            "date" => now.format("Today is %A, %B %-d, %Y").to_string(),
            "time" => now.format("It is %H:%M").to_string(),
            _ => now.format("It is %H:%M on %A, %B %-d, %Y").to_string(),
        };
        Ok(Value::String(text))
    }
}
