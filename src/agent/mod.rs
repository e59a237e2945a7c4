//! Orchestration facade
//!
//! An [`Agent`] owns one tool registry, planner, executor and history. It
//! offers three entry points that all end in the same executor and the same
//! result envelope:
//!
//! - [`Agent::handle`]: planner fallback chain, one plan per command
//! - [`Agent::run_sequence`]: split on separator words, classify each segment
//! - [`Agent::run_ai_response`]: execute the command found in LLM free text

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::commands::{CommandInterpreter, CommandSplitter, Operation};
use crate::config::Config;
use crate::error::{ErrorCategory, ErrorReport};
use crate::extraction::ResponseExtractor;
use crate::history::History;
use crate::normalize::{normalize, ResultEnvelope};
use crate::persistence::AgentState;
use crate::planning::{
    MultiStepPlan, PlanContext, PlanEvent, PlanExecutor, PlanStatus, Planner, Plugin,
    AVAILABLE_TOOLS_KEY,
};
use crate::tools::{CallableTool, DispatcherTool, Tool, ToolContext, ToolRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// What a caller gets back from one entry point
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub status: OutcomeStatus,
    /// Executed plan with every step's result or error; `None` when nothing ran
    pub plan: Option<MultiStepPlan>,
    pub envelope: ResultEnvelope,
    /// Categorized failure with remediation suggestions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ErrorReport>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    fn without_plan(status: OutcomeStatus, envelope: ResultEnvelope) -> Self {
        Self {
            status,
            plan: None,
            envelope,
            report: None,
        }
    }

    fn with_report(mut self, report: Option<ErrorReport>) -> Self {
        self.report = report;
        self
    }
}

pub struct Agent {
    id: String,
    config: Config,
    registry: ToolRegistry,
    splitter: CommandSplitter,
    interpreter: CommandInterpreter,
    extractor: ResponseExtractor,
    planner: Planner,
    executor: PlanExecutor,
    history: History,
    context: PlanContext,
    created_at: DateTime<Utc>,
}

impl Agent {
    /// Agent with every bundled tool and a planner built from `config`
    pub fn new(config: Config) -> Result<Self> {
        let planner = Planner::from_config(&config);
        Self::with_planner(config, planner)
    }

    pub fn with_planner(config: Config, planner: Planner) -> Result<Self> {
        let interpreter = CommandInterpreter::new(config.interpreter.clone())?;
        Ok(Self {
            id: format!("agent-{}", &Uuid::new_v4().to_string()[..8]),
            registry: ToolRegistry::with_builtin_tools(),
            splitter: CommandSplitter::new(config.splitter.clone()),
            interpreter,
            extractor: ResponseExtractor::new(),
            planner,
            executor: PlanExecutor::new(&config.executor),
            history: History::from_config(&config.history),
            context: PlanContext::new(),
            created_at: Utc::now(),
            config,
        })
    }

    /// Forward executor progress events to `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<PlanEvent>) -> Self {
        self.executor = PlanExecutor::new(&self.config.executor).with_events(tx);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Context passed to plugins and the LLM planner
    pub fn context_mut(&mut self) -> &mut PlanContext {
        &mut self.context
    }

    pub fn register_tool(&mut self, tool: impl Tool + 'static) {
        self.registry.register(tool);
    }

    pub fn register_callable(&mut self, tool: impl CallableTool + 'static) {
        self.registry.register_callable(tool);
    }

    pub fn register_dispatcher(&mut self, tool: impl DispatcherTool + 'static) {
        self.registry.register_dispatcher(tool);
    }

    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) {
        self.planner.register_plugin(plugin);
    }

    fn plan_context(&self) -> PlanContext {
        let mut context = self.context.clone();
        context.insert(
            AVAILABLE_TOOLS_KEY.to_string(),
            Value::Array(self.registry.describe()),
        );
        context
    }

    /// Plan a command through the fallback chain and execute it
    pub async fn handle(&mut self, command: &str) -> Outcome {
        let plan = self.planner.plan(command, &self.plan_context()).await;
        self.execute_plan(plan, &[]).await
    }

    /// Split `input` into segments, classify each and run them as one plan.
    ///
    /// Every segment's result stays on its plan step; the envelope reflects
    /// the last executed segment.
    pub async fn run_sequence(&mut self, input: &str) -> Outcome {
        let segments = self.splitter.split(input);
        if segments.is_empty() {
            return Outcome::without_plan(
                OutcomeStatus::Failure,
                ResultEnvelope::Error("No command given.".to_string()),
            )
            .with_report(Some(ErrorReport::new(ErrorCategory::UserInput, "no command given")));
        }

        let steps = segments
            .iter()
            .map(|segment| {
                let operation = self.interpreter.classify(segment);
                tracing::debug!("'{}' -> {:?} {}", segment, operation.kind, operation.action);
                operation.into_step()
            })
            .collect();

        let plan = MultiStepPlan::new(input).with_steps(steps);
        self.execute_plan(plan, &segments).await
    }

    /// Execute the command carried by LLM free text, if any
    pub async fn run_ai_response(&mut self, ai_text: &str) -> Outcome {
        let extraction = self.extractor.extract(ai_text);

        if let Some(command) = extraction.command.filter(|_| extraction.success) {
            let plan = MultiStepPlan::single(ai_text, Operation::shell(&command).into_step());
            return self.execute_plan(plan, &[command]).await;
        }

        let metadata = extraction.metadata;
        if let Some(report) = metadata.report() {
            tracing::warn!(
                category = %report.category,
                "AI response yielded no command: {}",
                report.message
            );
            let envelope = ResultEnvelope::Error(report.message.clone());
            return Outcome::without_plan(OutcomeStatus::Failure, envelope).with_report(Some(report));
        }

        // Informational payload without a command to run
        let info = metadata
            .information
            .or_else(|| metadata.info_type.map(Value::String))
            .unwrap_or(Value::Null);
        Outcome::without_plan(OutcomeStatus::Success, normalize(&json!({ "output": info })))
    }

    async fn execute_plan(&mut self, mut plan: MultiStepPlan, segments: &[String]) -> Outcome {
        let ctx = ToolContext::from_config(&self.config.tools);
        let last = self.executor.execute(&mut plan, &self.registry, &ctx).await;

        for (index, step) in plan.steps.iter().enumerate() {
            if !step.status.is_terminal() {
                break;
            }
            let result = match (&step.result, &step.error) {
                (Some(result), _) => result.clone(),
                (None, Some(error)) => json!({ "error": error }),
                (None, None) => Value::Null,
            };
            let command = segments.get(index).unwrap_or(&plan.command);
            self.history.add(
                command.clone(),
                step.action.clone(),
                Value::Object(step.parameters.clone()),
                result,
            );
        }

        let envelope = normalize(&last);
        let status = if plan.status == PlanStatus::Completed && !envelope.is_error() {
            OutcomeStatus::Success
        } else {
            OutcomeStatus::Failure
        };
        tracing::info!("{} -> {:?} ({})", plan.id, status, plan.summary());

        let report = plan.steps.iter().find_map(|s| s.report.clone());

        Outcome {
            status,
            plan: Some(plan),
            envelope,
            report,
        }
    }

    /// Snapshot of the agent without its tool registry
    pub fn state(&self) -> AgentState {
        AgentState {
            agent_id: self.id.clone(),
            steps: self.history.get(None).into_iter().cloned().collect(),
            context: self.context.clone(),
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    pub fn save_state(&self, path: &Path) -> Result<()> {
        self.state().save(path)
    }
}
