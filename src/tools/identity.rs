use serde_json::json;

use super::FnTool;

pub const IDENTITY: &str = "I'm a command orchestrator. I turn what you type into file, shell and \
system actions, run them in order, and tell you how it went.";

pub fn identity_tool() -> FnTool {
    FnTool::new("identity", "Describes this assistant.", |_| Ok(json!(IDENTITY)))
}
