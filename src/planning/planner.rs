//! Command planner
//!
//! Turns one command into a [`MultiStepPlan`] by walking an ordered list of
//! planning stages. Each stage either proposes a plan or declines; the first
//! proposal wins. The last stage (echo) never declines.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::config::{Config, PlannerConfig};
use crate::extraction::locate_json;
use crate::llm::{create_client, LlmClient, Message};
use crate::tools::ACTION_KEY;

use super::executor::PLUGIN_ACTION;
use super::types::{MultiStepPlan, PlanStep};

/// Free-form context handed to plugins and the LLM planner
pub type PlanContext = Map<String, Value>;

/// Context key the agent fills with the registry's tool descriptions
pub const AVAILABLE_TOOLS_KEY: &str = "available_tools";

const PLANNING_PROMPT: &str = r#"You route a user's command to exactly one tool.

Respond with ONLY a JSON object (no markdown, no explanation):
{
  "tool": "name of one of the available tools",
  "action": "one of that tool's commands",
  "params": { "parameter": "value" }
}

If no tool fits, respond with {"tool": "", "action": ""}."#;

/// A plugin may claim a command before any other stage sees it
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// `Some(result)` claims the command; the result becomes the step's output
    async fn try_handle(&self, command: &str, context: &PlanContext) -> Option<Value>;
}

/// One link of the planner's fallback chain
#[async_trait]
pub trait PlanningStage: Send + Sync {
    fn name(&self) -> &str;
    async fn propose(&self, command: &str, context: &PlanContext) -> Option<MultiStepPlan>;
}

/// Build a single-step plan dispatching `action` on `tool`
fn tool_plan(command: &str, tool: &str, action: &str, mut params: Map<String, Value>) -> MultiStepPlan {
    params.insert(ACTION_KEY.to_string(), Value::String(action.to_string()));
    MultiStepPlan::single(command, PlanStep::new(tool, params))
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

type PluginList = Arc<RwLock<Vec<Arc<dyn Plugin>>>>;

/// Stage 1: registered plugins, asked in registration order
pub struct PluginStage {
    plugins: PluginList,
}

#[async_trait]
impl PlanningStage for PluginStage {
    fn name(&self) -> &str {
        "plugin"
    }

    async fn propose(&self, command: &str, context: &PlanContext) -> Option<MultiStepPlan> {
        // Snapshot so no lock is held across an await
        let plugins: Vec<Arc<dyn Plugin>> = match self.plugins.read() {
            Ok(plugins) => plugins.clone(),
            Err(_) => {
                tracing::warn!("Plugin list lock poisoned; skipping plugins");
                return None;
            }
        };

        for plugin in plugins {
            if let Some(result) = plugin.try_handle(command, context).await {
                tracing::debug!("Plugin '{}' claimed command", plugin.name());
                let mut parameters = Map::new();
                parameters.insert("plugin".to_string(), json!(plugin.name()));
                parameters.insert("result".to_string(), result.clone());
                return Some(MultiStepPlan::single(
                    command,
                    PlanStep::precomputed(PLUGIN_ACTION, parameters, result),
                ));
            }
        }
        None
    }
}

/// Stage 2: fixed keyword routing that bypasses the LLM
pub struct FastPathStage {
    launch_keywords: Vec<String>,
    known_apps: Vec<String>,
}

impl FastPathStage {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            launch_keywords: config.launch_keywords.iter().map(|k| k.to_lowercase()).collect(),
            known_apps: config.known_apps.iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    fn desktop_action(lower: &str) -> Option<&'static str> {
        if lower.contains("screenshot") {
            Some("screenshot")
        } else if lower.contains("mouse") || lower.contains("click") {
            Some("mouse")
        } else if lower.contains("window") {
            Some("window")
        } else {
            None
        }
    }

    fn launch_target(&self, lower: &str) -> Option<String> {
        let words: Vec<&str> = lower
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()))
            .collect();
        let keyword_at = words
            .iter()
            .position(|w| self.launch_keywords.iter().any(|k| k == w))?;
        words[keyword_at + 1..]
            .iter()
            .find(|w| self.known_apps.iter().any(|a| a == *w))
            .map(|w| w.to_string())
    }
}

#[async_trait]
impl PlanningStage for FastPathStage {
    fn name(&self) -> &str {
        "fast-path"
    }

    async fn propose(&self, command: &str, _context: &PlanContext) -> Option<MultiStepPlan> {
        let lower = command.to_lowercase();

        if let Some(action) = Self::desktop_action(&lower) {
            return Some(tool_plan(command, "desktop", action, params(json!({ "command": command }))));
        }

        self.launch_target(&lower)
            .map(|app| tool_plan(command, "launcher", "open", params(json!({ "app": app }))))
    }
}

/// What an external planner decided
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmPlan {
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl LlmPlan {
    pub fn is_usable(&self) -> bool {
        !self.tool.trim().is_empty() && !self.action.trim().is_empty()
    }
}

/// Contract for an external planner
#[async_trait]
pub trait LlmPlanner: Send + Sync {
    async fn plan(&self, command: &str, context: &PlanContext) -> Result<LlmPlan>;
}

/// [`LlmPlanner`] backed by a chat-completions client
pub struct HttpLlmPlanner {
    client: Box<dyn LlmClient>,
}

impl HttpLlmPlanner {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }

    fn build_prompt(command: &str, context: &PlanContext) -> String {
        let mut prompt = format!("Command: {}\n", command);

        if let Some(Value::Array(tools)) = context.get(AVAILABLE_TOOLS_KEY) {
            prompt.push_str("\nAvailable tools:\n");
            for tool in tools {
                let commands = tool["commands"]
                    .as_array()
                    .map(|c| {
                        c.iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                prompt.push_str(&format!(
                    "- {}: {} (commands: {})\n",
                    tool["name"].as_str().unwrap_or_default(),
                    tool["description"].as_str().unwrap_or_default(),
                    commands
                ));
            }
        }

        let extra: Map<String, Value> = context
            .iter()
            .filter(|(k, _)| k.as_str() != AVAILABLE_TOOLS_KEY)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !extra.is_empty() {
            prompt.push_str(&format!("\nContext:\n{}\n", Value::Object(extra)));
        }

        prompt
    }
}

#[async_trait]
impl LlmPlanner for HttpLlmPlanner {
    async fn plan(&self, command: &str, context: &PlanContext) -> Result<LlmPlan> {
        let messages = vec![Message::user(Self::build_prompt(command, context))];
        let reply = self
            .client
            .send_message_with_system(&messages, Some(PLANNING_PROMPT))
            .await?;

        let json_text = locate_json(&reply)
            .with_context(|| format!("No JSON object in planner reply: {}", reply))?;
        serde_json::from_str(json_text).context("Failed to parse planner reply")
    }
}

/// Stage 3: one bounded request to the external planner
pub struct LlmStage {
    planner: Arc<dyn LlmPlanner>,
    timeout: Duration,
}

impl LlmStage {
    pub fn new(planner: Arc<dyn LlmPlanner>, timeout: Duration) -> Self {
        Self { planner, timeout }
    }
}

#[async_trait]
impl PlanningStage for LlmStage {
    fn name(&self) -> &str {
        "llm"
    }

    async fn propose(&self, command: &str, context: &PlanContext) -> Option<MultiStepPlan> {
        let plan = match tokio::time::timeout(self.timeout, self.planner.plan(command, context)).await {
            Ok(Ok(plan)) => plan,
            Ok(Err(e)) => {
                tracing::warn!("LLM planner failed, falling back: {:#}", e);
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    "LLM planner timed out after {}s, falling back",
                    self.timeout.as_secs()
                );
                return None;
            }
        };

        if !plan.is_usable() {
            tracing::warn!("LLM planner returned no tool/action, falling back");
            return None;
        }

        Some(tool_plan(command, plan.tool.trim(), plan.action.trim(), plan.params))
    }
}

lazy_static! {
    static ref LOCATION: Regex = Regex::new(r"(?i)\bin ([\w\s]+)").unwrap();
    static ref CALCULATE: Regex = Regex::new(r"(?i)calculate\s+(.+)").unwrap();
    static ref DATE_TIME: Regex = Regex::new(r"(?i)\b(time|date|day|today)\b").unwrap();
}

/// One deterministic rule; `apply` sees the raw command and its lowercase form
pub struct HeuristicRule {
    pub name: &'static str,
    pub apply: fn(&str, &str) -> Option<MultiStepPlan>,
}

fn weather_rule(command: &str, lower: &str) -> Option<MultiStepPlan> {
    if !lower.contains("weather") {
        return None;
    }
    let mut p = Map::new();
    if let Some(location) = LOCATION
        .captures(command)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|l| !l.is_empty())
    {
        p.insert("location".to_string(), json!(location));
    }
    Some(tool_plan(command, "weather", "execute", p))
}

fn system_info_rule(command: &str, lower: &str) -> Option<MultiStepPlan> {
    (lower.contains("system info") || lower.contains("system status"))
        .then(|| tool_plan(command, "system", "info", Map::new()))
}

fn datetime_rule(command: &str, _lower: &str) -> Option<MultiStepPlan> {
    let word = DATE_TIME.captures(command)?.get(1)?.as_str().to_lowercase();
    let action = if word == "time" { "time" } else { "date" };
    Some(tool_plan(command, "datetime", action, Map::new()))
}

fn calculator_rule(command: &str, _lower: &str) -> Option<MultiStepPlan> {
    let expression = CALCULATE.captures(command)?.get(1)?.as_str().trim();
    Some(tool_plan(
        command,
        "calculator",
        "execute",
        params(json!({ "expression": expression })),
    ))
}

fn identity_rule(command: &str, lower: &str) -> Option<MultiStepPlan> {
    ["who are you", "what are you", "your name"]
        .iter()
        .any(|q| lower.contains(q))
        .then(|| tool_plan(command, "identity", "execute", Map::new()))
}

fn memory_rule(command: &str, lower: &str) -> Option<MultiStepPlan> {
    // `lower` is ASCII-lowercased so byte offsets line up with `command`
    if let Some(at) = lower.find("remember ") {
        let fact = command[at + "remember ".len()..].trim();
        let fact = fact
            .strip_prefix("that ")
            .or_else(|| fact.strip_prefix("That "))
            .unwrap_or(fact);
        return Some(tool_plan(command, "memory", "remember", params(json!({ "fact": fact }))));
    }
    if lower.contains("recall") {
        return Some(tool_plan(command, "memory", "recall", Map::new()));
    }
    if let Some(at) = lower.find("forget") {
        let mut p = Map::new();
        let target = command[at + "forget".len()..].trim();
        if !target.is_empty() {
            p.insert("fact".to_string(), json!(target));
        }
        return Some(tool_plan(command, "memory", "forget", p));
    }
    None
}

/// Stage 4: ordered deterministic rules
pub struct HeuristicStage {
    rules: Vec<HeuristicRule>,
}

impl HeuristicStage {
    pub fn new() -> Self {
        Self {
            rules: vec![
                HeuristicRule { name: "weather", apply: weather_rule },
                HeuristicRule { name: "system-info", apply: system_info_rule },
                HeuristicRule { name: "datetime", apply: datetime_rule },
                HeuristicRule { name: "calculator", apply: calculator_rule },
                HeuristicRule { name: "identity", apply: identity_rule },
                HeuristicRule { name: "memory", apply: memory_rule },
            ],
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }
}

impl Default for HeuristicStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlanningStage for HeuristicStage {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn propose(&self, command: &str, _context: &PlanContext) -> Option<MultiStepPlan> {
        let lower = command.to_ascii_lowercase();
        self.rules.iter().find_map(|rule| {
            let plan = (rule.apply)(command, &lower)?;
            tracing::debug!("Heuristic rule '{}' matched", rule.name);
            Some(plan)
        })
    }
}

fn echo_plan(command: &str) -> MultiStepPlan {
    tool_plan(command, "echo", "execute", params(json!({ "text": command })))
}

/// Stage 5: repeat the command back
pub struct EchoStage;

#[async_trait]
impl PlanningStage for EchoStage {
    fn name(&self) -> &str {
        "echo"
    }

    async fn propose(&self, command: &str, _context: &PlanContext) -> Option<MultiStepPlan> {
        Some(echo_plan(command))
    }
}

/// Priority-ordered fallback chain of planning stages
pub struct Planner {
    stages: Vec<Box<dyn PlanningStage>>,
    plugins: PluginList,
}

impl Planner {
    /// plugin, fast-path, llm (when given), heuristic, echo
    pub fn new(config: &PlannerConfig, llm: Option<Arc<dyn LlmPlanner>>, llm_timeout: Duration) -> Self {
        let plugins: PluginList = Arc::new(RwLock::new(Vec::new()));

        let mut stages: Vec<Box<dyn PlanningStage>> = vec![
            Box::new(PluginStage {
                plugins: plugins.clone(),
            }),
            Box::new(FastPathStage::new(config)),
        ];
        if let Some(llm) = llm {
            stages.push(Box::new(LlmStage::new(llm, llm_timeout)));
        }
        stages.push(Box::new(HeuristicStage::new()));
        stages.push(Box::new(EchoStage));

        Self { stages, plugins }
    }

    /// Planner using the HTTP planner when `[llm] enabled = true`
    pub fn from_config(config: &Config) -> Self {
        let llm: Option<Arc<dyn LlmPlanner>> = config
            .llm
            .enabled
            .then(|| Arc::new(HttpLlmPlanner::new(create_client(&config.llm))) as Arc<dyn LlmPlanner>);
        Self::new(
            &config.planner,
            llm,
            Duration::from_secs(config.llm.timeout_secs),
        )
    }

    /// Planner over an explicit stage list; plugins registered later are not consulted
    pub fn with_stages(stages: Vec<Box<dyn PlanningStage>>) -> Self {
        Self {
            stages,
            plugins: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) {
        match self.plugins.write() {
            Ok(mut plugins) => plugins.push(plugin),
            Err(_) => tracing::warn!("Plugin list lock poisoned; '{}' not registered", plugin.name()),
        }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Always returns a plan
    pub async fn plan(&self, command: &str, context: &PlanContext) -> MultiStepPlan {
        for stage in &self.stages {
            if let Some(plan) = stage.propose(command, context).await {
                tracing::info!(
                    "Planned '{}' via {} stage ({} step(s))",
                    command,
                    stage.name(),
                    plan.steps.len()
                );
                return plan;
            }
            tracing::debug!("Stage {} declined '{}'", stage.name(), command);
        }
        echo_plan(command)
    }
}
