use serde_json::{Map, Value};

use crate::config::ExecutorConfig;

pub const GREETING: &str = "Hello! How can I help you today?";

/// Canned replies for actions no registered tool understands
#[derive(Debug, Clone)]
pub struct DefaultTool {
    greetings: Vec<String>,
}

impl DefaultTool {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            greetings: config
                .greetings
                .iter()
                .map(|g| g.trim().to_lowercase())
                .collect(),
        }
    }

    /// Text the step was about: its first string parameter, else the action name
    fn input_text(action: &str, params: &Map<String, Value>) -> String {
        ["text", "command", "query"]
            .iter()
            .find_map(|key| params.get(*key).and_then(Value::as_str))
            .unwrap_or(action)
            .to_string()
    }

    pub fn is_greeting(&self, text: &str) -> bool {
        let cleaned = text
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_punctuation())
            .to_lowercase();
        self.greetings.iter().any(|g| *g == cleaned)
    }

    pub fn respond(&self, action: &str, params: &Map<String, Value>) -> Value {
        let text = Self::input_text(action, params);
        if self.is_greeting(&text) {
            Value::String(GREETING.to_string())
        } else {
            Value::String(format!("Sorry, I didn't understand '{}'.", text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_greeting_and_fallback() {
        let tool = DefaultTool::new(&ExecutorConfig::default());
        let greet = json!({"text": "Hello!"});
        assert_eq!(
            tool.respond("chat", greet.as_object().unwrap()),
            json!(GREETING)
        );
        assert_eq!(
            tool.respond("teleport", &Map::new()),
            json!("Sorry, I didn't understand 'teleport'.")
        );
    }
}
