use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::ToolConfig;
use crate::error::ToolError;

pub mod calculator;
pub mod datetime;
pub mod default;
pub mod echo;
pub mod file;
pub mod identity;
pub mod launcher;
pub mod memory;
pub mod shell;
pub mod system;
pub mod weather;

pub use calculator::CalculatorTool;
pub use datetime::DateTimeTool;
pub use default::DefaultTool;
pub use echo::echo_tool;
pub use file::FileTool;
pub use identity::identity_tool;
pub use launcher::LauncherTool;
pub use memory::MemoryTool;
pub use shell::ShellTool;
pub use system::SystemTool;
pub use weather::WeatherTool;

/// Reserved parameter key carrying the action for multi-action tools
pub const ACTION_KEY: &str = "action";

/// Action used when the parameters name none
pub const DEFAULT_ACTION: &str = "execute";

/// Context passed to tool execution containing working directory and configuration
#[derive(Clone)]
pub struct ToolContext<'a> {
    pub working_dir: &'a Path,
    pub config: &'a ToolConfig,
}

impl<'a> ToolContext<'a> {
    pub fn new(working_dir: &'a Path, config: &'a ToolConfig) -> Self {
        Self {
            working_dir,
            config,
        }
    }

    /// Context rooted at the configured working directory
    pub fn from_config(config: &'a ToolConfig) -> Self {
        Self::new(&config.working_dir, config)
    }
}

/// The uniform dispatch contract every registered tool exposes
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn execute(
        &self,
        action: &str,
        params: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError>;

    fn available_commands(&self) -> Vec<String> {
        vec![DEFAULT_ACTION.to_string()]
    }

    fn command_help(&self, command: &str) -> Option<String> {
        self.available_commands()
            .iter()
            .any(|c| c == command)
            .then(|| format!("{} {}", self.name(), command))
    }

    fn validate_command(&self, action: &str, _params: &Map<String, Value>) -> Result<(), ToolError> {
        if self.available_commands().iter().any(|c| c == action) {
            Ok(())
        } else {
            Err(ToolError::UnknownAction {
                tool: self.name().to_string(),
                action: action.to_string(),
            })
        }
    }
}

/// Single-purpose tool that takes its parameter map directly
#[async_trait]
pub trait CallableTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn call(&self, params: Map<String, Value>, ctx: &ToolContext<'_>) -> Result<Value>;
}

/// Multi-action tool that receives the action separately from its arguments
#[async_trait]
pub trait DispatcherTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn actions(&self) -> &[&'static str];
    async fn dispatch(
        &self,
        action: &str,
        args: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError>;
}

/// Adapts a [`CallableTool`] to the uniform contract; the action is ignored
pub struct CallableAdapter<T>(pub T);

#[async_trait]
impl<T: CallableTool> Tool for CallableAdapter<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    async fn execute(
        &self,
        _action: &str,
        params: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        Ok(self.0.call(params, ctx).await?)
    }

    fn validate_command(&self, _action: &str, _params: &Map<String, Value>) -> Result<(), ToolError> {
        Ok(())
    }
}

/// Adapts a [`DispatcherTool`] to the uniform contract
pub struct DispatcherAdapter<T>(pub T);

#[async_trait]
impl<T: DispatcherTool> Tool for DispatcherAdapter<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    async fn execute(
        &self,
        action: &str,
        params: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        self.validate_command(action, &params)?;
        self.0.dispatch(action, params, ctx).await
    }

    fn available_commands(&self) -> Vec<String> {
        self.0.actions().iter().map(|a| a.to_string()).collect()
    }
}

type SyncHandler = dyn Fn(&Map<String, Value>) -> Result<Value> + Send + Sync;

/// Synchronous closure exposed as a [`CallableTool`]
pub struct FnTool {
    name: String,
    description: String,
    handler: Box<SyncHandler>,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl CallableTool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn call(&self, params: Map<String, Value>, _ctx: &ToolContext<'_>) -> Result<Value> {
        (self.handler)(&params)
    }
}

/// Pull a required string parameter out of a tool's argument map
pub fn require_str<'a>(
    tool: &str,
    params: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ToolError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::invalid_params(tool, format!("missing '{}'", key)))
}

/// Name-to-tool map; registering an existing name replaces the earlier tool
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry holding every bundled tool
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        // File and shell operations
        registry.register_dispatcher(FileTool);
        registry.register(ShellTool);
        registry.register_dispatcher(SystemTool);
        // Planner fallbacks
        registry.register_callable(echo_tool());
        registry.register(DateTimeTool);
        registry.register_callable(CalculatorTool);
        registry.register_callable(WeatherTool::new());
        registry.register_dispatcher(MemoryTool::new());
        registry.register_callable(identity_tool());
        registry.register_dispatcher(LauncherTool);
        registry
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!("Replaced previously registered tool '{}'", name);
        }
    }

    pub fn register_callable(&mut self, tool: impl CallableTool + 'static) {
        self.register(CallableAdapter(tool));
    }

    pub fn register_dispatcher(&mut self, tool: impl DispatcherTool + 'static) {
        self.register(DispatcherAdapter(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Name, description and commands of every tool, sorted by name
    pub fn describe(&self) -> Vec<Value> {
        self.names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "commands": tool.available_commands(),
                })
            })
            .collect()
    }

    /// Dispatch `params` to the named tool.
    ///
    /// The reserved `action` key is removed from the parameters and passed
    /// separately; it defaults to `execute` when absent.
    pub async fn execute_tool(
        &self,
        name: &str,
        params: Value,
        ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let Value::Object(mut params) = params else {
            return Err(ToolError::TypeMismatch {
                tool: name.to_string(),
            });
        };

        let action = match params.remove(ACTION_KEY) {
            Some(Value::String(action)) => action,
            Some(_) => {
                return Err(ToolError::invalid_params(name, "'action' must be a string"));
            }
            None => DEFAULT_ACTION.to_string(),
        };

        tracing::debug!("Dispatching {}::{}", name, action);
        tool.execute(&action, params, ctx).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Counter;

    #[async_trait]
    impl DispatcherTool for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn description(&self) -> &str {
            "Counts arguments"
        }

        fn actions(&self) -> &[&'static str] {
            &["count"]
        }

        async fn dispatch(
            &self,
            action: &str,
            args: Map<String, Value>,
            _ctx: &ToolContext<'_>,
        ) -> Result<Value, ToolError> {
            Ok(json!({ "action": action, "args": args.len(), "has_action_key": args.contains_key(ACTION_KEY) }))
        }
    }

    fn ctx_config() -> ToolConfig {
        ToolConfig::default()
    }

    #[tokio::test]
    async fn test_dispatcher_receives_stripped_action() {
        let config = ctx_config();
        let ctx = ToolContext::from_config(&config);
        let mut registry = ToolRegistry::new();
        registry.register_dispatcher(Counter);

        let result = registry
            .execute_tool("counter", json!({"action": "count", "a": 1, "b": 2}), &ctx)
            .await
            .unwrap();
        assert_eq!(result, json!({"action": "count", "args": 2, "has_action_key": false}));
    }

    #[tokio::test]
    async fn test_dispatcher_rejects_unknown_action() {
        let config = ctx_config();
        let ctx = ToolContext::from_config(&config);
        let mut registry = ToolRegistry::new();
        registry.register_dispatcher(Counter);

        let err = registry
            .execute_tool("counter", json!({}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownAction { ref action, .. } if action == "execute"));
    }

    #[tokio::test]
    async fn test_sync_callable_and_overwrite() {
        let config = ctx_config();
        let ctx = ToolContext::from_config(&config);
        let mut registry = ToolRegistry::new();
        registry.register_callable(FnTool::new("greet", "first", |_| Ok(json!("one"))));
        registry.register_callable(FnTool::new("greet", "second", |p| {
            Ok(json!(format!("hi {}", p["who"].as_str().unwrap_or("?"))))
        }));

        assert_eq!(registry.names(), vec!["greet"]);
        assert_eq!(registry.get("greet").unwrap().description(), "second");
        let result = registry
            .execute_tool("greet", json!({"who": "ana"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result, json!("hi ana"));
    }

    #[tokio::test]
    async fn test_type_mismatch_names_tool() {
        let config = ctx_config();
        let ctx = ToolContext::from_config(&config);
        let mut registry = ToolRegistry::new();
        registry.register_callable(FnTool::new("greet", "", |_| Ok(Value::Null)));

        let err = registry
            .execute_tool("greet", json!("not a map"), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("greet"));
        assert!(matches!(err, ToolError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let config = ctx_config();
        let ctx = ToolContext::from_config(&config);
        let registry = ToolRegistry::new();
        let err = registry
            .execute_tool("nope", json!({}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown action: nope");
    }

    #[test]
    fn test_builtin_registry_describes_tools() {
        let registry = ToolRegistry::with_builtin_tools();
        for name in ["file", "shell", "system", "echo", "datetime", "calculator", "weather", "memory", "identity", "launcher"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        let file = registry
            .describe()
            .into_iter()
            .find(|d| d["name"] == "file")
            .unwrap();
        assert!(file["commands"].as_array().unwrap().contains(&json!("read")));
    }

    #[test]
    fn test_require_str() {
        let params = json!({"a": "x", "b": "  ", "c": 3});
        let params = params.as_object().unwrap();
        assert_eq!(require_str("t", params, "a").unwrap(), "x");
        assert!(require_str("t", params, "b").is_err());
        assert!(require_str("t", params, "c").is_err());
        assert!(require_str("t", params, "d").is_err());
    }
}
