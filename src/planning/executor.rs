//! Plan executor
//!
//! Runs a plan's steps strictly in order against the tool registry and
//! stops at the first failure. Steps after the failing one stay pending.

use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::config::ExecutorConfig;
use crate::error::ToolError;
use crate::tools::{DefaultTool, ToolContext, ToolRegistry};

use super::types::{MultiStepPlan, PlanEvent, PlanStatus, PlanStep, PlanStepStatus};

/// Action name of steps resolved at planning time
pub const PLUGIN_ACTION: &str = "plugin";

/// Executes a plan step-by-step
pub struct PlanExecutor {
    /// Answers actions no tool is registered for; `None` makes them fail
    default_tool: Option<DefaultTool>,
    step_timeout: Duration,
    /// Event sender for progress updates
    event_tx: Option<mpsc::UnboundedSender<PlanEvent>>,
}

impl PlanExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            default_tool: config.default_tool.then(|| DefaultTool::new(config)),
            step_timeout: Duration::from_secs(config.step_timeout_secs),
            event_tx: None,
        }
    }

    pub fn with_events(mut self, event_tx: mpsc::UnboundedSender<PlanEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    fn emit(&self, event: PlanEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Execute a plan in place and return the last executed step's result.
    ///
    /// A failed step yields `{"error": message}`; an empty plan yields `null`.
    pub async fn execute(
        &self,
        plan: &mut MultiStepPlan,
        registry: &ToolRegistry,
        ctx: &ToolContext<'_>,
    ) -> Value {
        plan.status = PlanStatus::InProgress;
        if plan.parallel {
            tracing::warn!(
                "Plan {} requested parallel execution; running steps sequentially",
                plan.id
            );
        }

        let mut last = Value::Null;
        for index in 0..plan.steps.len() {
            plan.current_step = index;
            let step = &mut plan.steps[index];

            if step.action == PLUGIN_ACTION {
                last = Self::reuse_plugin_result(step);
                continue;
            }

            self.emit(PlanEvent::StepStarted {
                plan_id: plan.id.clone(),
                index,
                action: step.action.clone(),
            });
            step.start();
            tracing::debug!("Step {} of {}: {}", index + 1, plan.id, step.action);

            let started = Instant::now();
            let outcome = self.run_step(step, registry, ctx).await;
            step.duration_ms = Some(started.elapsed().as_millis() as u64);

            match outcome {
                Ok(result) => {
                    step.complete(result.clone());
                    last = result;
                    self.emit(PlanEvent::StepCompleted {
                        plan_id: plan.id.clone(),
                        index,
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    tracing::warn!(
                        category = %e.category(),
                        "Step {} ({}) failed: {}",
                        index + 1,
                        step.action,
                        message
                    );
                    if step.fail(message.clone()) {
                        step.report = Some(e.report());
                    }
                    last = json!({ "error": message.clone() });
                    self.emit(PlanEvent::StepCompleted {
                        plan_id: plan.id.clone(),
                        index,
                        success: false,
                        error: Some(message),
                    });
                    break;
                }
            }
        }

        if plan.all_completed() {
            plan.status = PlanStatus::Completed;
            plan.completed_at = Some(chrono::Utc::now());
        } else {
            plan.status = PlanStatus::Failed;
        }

        self.emit(PlanEvent::PlanCompleted {
            plan_id: plan.id.clone(),
            success: plan.status == PlanStatus::Completed,
            summary: plan.summary(),
        });

        last
    }

    fn reuse_plugin_result(step: &mut PlanStep) -> Value {
        if step.status != PlanStepStatus::Completed {
            let result = step.parameters.get("result").cloned().unwrap_or(Value::Null);
            step.complete(result);
        }
        step.result.clone().unwrap_or(Value::Null)
    }

    async fn run_step(
        &self,
        step: &PlanStep,
        registry: &ToolRegistry,
        ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        if !registry.contains(&step.action) {
            return match &self.default_tool {
                Some(default) => {
                    tracing::debug!("No tool named '{}'; using default reply", step.action);
                    Ok(default.respond(&step.action, &step.parameters))
                }
                None => Err(ToolError::NotFound(step.action.clone())),
            };
        }

        let params = Value::Object(step.parameters.clone());
        match tokio::time::timeout(
            self.step_timeout,
            registry.execute_tool(&step.action, params, ctx),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ToolError::Failed(anyhow::anyhow!(
                "Step '{}' timed out after {} seconds",
                step.action,
                self.step_timeout.as_secs()
            ))),
        }
    }
}
