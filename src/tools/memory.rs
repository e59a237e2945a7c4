use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

use super::{require_str, DispatcherTool, ToolContext};
use crate::error::ToolError;

/// In-memory fact list shared by clones of the tool
#[derive(Clone, Default)]
pub struct MemoryTool {
    facts: Arc<Mutex<Vec<String>>>,
}

impl MemoryTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn facts(&self) -> Vec<String> {
        self.facts.lock().map(|f| f.clone()).unwrap_or_default()
    }

    fn with_facts<T>(&self, f: impl FnOnce(&mut Vec<String>) -> T) -> Result<T, ToolError> {
        let mut facts = self
            .facts
            .lock()
            .map_err(|_| ToolError::Failed(anyhow::anyhow!("memory lock poisoned")))?;
        Ok(f(&mut facts))
    }
}

#[async_trait]
impl DispatcherTool for MemoryTool {
    fn name(&self) -> &str {
        "memory"
    }

    fn description(&self) -> &str {
        "Remembers, recalls and forgets facts for this session."
    }

    fn actions(&self) -> &[&'static str] {
        &["remember", "recall", "forget"]
    }

    async fn dispatch(
        &self,
        action: &str,
        args: Map<String, Value>,
        _ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        match action {
            "remember" => {
                let fact = require_str("memory", &args, "fact")?.trim().to_string();
                let reply = format!("I'll remember that {}", fact);
                self.with_facts(|facts| facts.push(fact))?;
                Ok(json!(reply))
            }
            "recall" => self.with_facts(|facts| {
                if facts.is_empty() {
                    json!("I don't remember anything yet.")
                } else {
                    json!(format!("I remember: {}", facts.join("; ")))
                }
            }),
            "forget" => {
                let target = args.get("fact").and_then(Value::as_str).map(str::to_lowercase);
                self.with_facts(|facts| match target {
                    Some(target) => {
                        let before = facts.len();
                        facts.retain(|f| !f.to_lowercase().contains(&target));
                        json!(format!("Forgot {} fact(s).", before - facts.len()))
                    }
                    None => {
                        facts.clear();
                        json!("Forgot everything.")
                    }
                })
            }
            other => Err(ToolError::UnknownAction {
                tool: "memory".to_string(),
                action: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;

    fn fact(text: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("fact".to_string(), json!(text));
        map
    }

    #[tokio::test]
    async fn test_remember_recall_forget() {
        let config = ToolConfig::default();
        let ctx = ToolContext::from_config(&config);
        let memory = MemoryTool::new();

        memory.dispatch("remember", fact("my cat is Tom"), &ctx).await.unwrap();
        memory.dispatch("remember", fact("the door code is 42"), &ctx).await.unwrap();
        assert_eq!(memory.facts().len(), 2);

        let recalled = memory.dispatch("recall", Map::new(), &ctx).await.unwrap();
        assert!(recalled.as_str().unwrap().contains("my cat is Tom"));

        memory.dispatch("forget", fact("CAT"), &ctx).await.unwrap();
        assert_eq!(memory.facts(), vec!["the door code is 42"]);

        memory.dispatch("forget", Map::new(), &ctx).await.unwrap();
        assert!(memory.facts().is_empty());
    }

    #[tokio::test]
    async fn test_remember_requires_fact() {
        let config = ToolConfig::default();
        let ctx = ToolContext::from_config(&config);
        assert!(MemoryTool::new()
            .dispatch("remember", Map::new(), &ctx)
            .await
            .is_err());
    }
}
