use serde_json::Value;

use super::FnTool;

/// Returns its `text` parameter unchanged; the planner's last resort
pub fn echo_tool() -> FnTool {
    FnTool::new("echo", "Repeats the given text back.", |params| {
        Ok(params
            .get("text")
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())))
    })
}
