//! Core types for plans

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ErrorReport;

/// Status of a plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl PlanStepStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            PlanStepStatus::Pending => "◯",
            PlanStepStatus::InProgress => "◐",
            PlanStepStatus::Completed => "✓",
            PlanStepStatus::Failed => "✗",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStepStatus::Completed | PlanStepStatus::Failed)
    }

    /// Transitions only move forward: pending -> in_progress -> completed|failed.
    /// A pending step may also be resolved directly (pre-computed results).
    pub fn can_transition_to(&self, next: PlanStepStatus) -> bool {
        use PlanStepStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (Pending, Completed) | (InProgress, Completed) | (InProgress, Failed)
        )
    }
}

/// A single step in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Tool name the step is dispatched to
    pub action: String,
    pub parameters: Map<String, Value>,
    pub status: PlanStepStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    /// Categorized form of `error`, with remediation suggestions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ErrorReport>,
    /// Last status change
    pub timestamp: DateTime<Utc>,
    /// Duration in milliseconds
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl PlanStep {
    pub fn new(action: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            action: action.into(),
            parameters,
            status: PlanStepStatus::Pending,
            result: None,
            error: None,
            report: None,
            timestamp: Utc::now(),
            duration_ms: None,
        }
    }

    /// Build a step from a JSON object literal; non-objects yield empty parameters
    pub fn with_params(action: impl Into<String>, params: Value) -> Self {
        let parameters = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(action, parameters)
    }

    /// A step whose result was already produced at planning time
    pub fn precomputed(action: impl Into<String>, parameters: Map<String, Value>, result: Value) -> Self {
        let mut step = Self::new(action, parameters);
        step.transition(PlanStepStatus::Completed);
        step.result = Some(result);
        step
    }

    fn transition(&mut self, next: PlanStepStatus) -> bool {
        if !self.status.can_transition_to(next) {
            tracing::warn!(
                "Ignoring step transition {:?} -> {:?} for '{}'",
                self.status,
                next,
                self.action
            );
            return false;
        }
        self.status = next;
        self.timestamp = Utc::now();
        true
    }

    pub fn start(&mut self) -> bool {
        self.transition(PlanStepStatus::InProgress)
    }

    pub fn complete(&mut self, result: Value) -> bool {
        let moved = self.transition(PlanStepStatus::Completed);
        if moved {
            self.result = Some(result);
        }
        moved
    }

    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        let moved = self.transition(PlanStepStatus::Failed);
        if moved {
            self.error = Some(error.into());
        }
        moved
    }
}

/// Overall plan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl PlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Completed | PlanStatus::Failed)
    }
}

/// An ordered list of steps derived from one command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiStepPlan {
    /// Unique plan ID
    pub id: String,
    /// Original command
    pub command: String,
    pub steps: Vec<PlanStep>,
    pub status: PlanStatus,
    /// Index of the step being (or last) executed
    pub current_step: usize,
    /// Accepted but not honored; execution is always sequential
    #[serde(default)]
    pub parallel: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl MultiStepPlan {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            id: format!("plan-{}", &Uuid::new_v4().to_string()[..8]),
            command: command.into(),
            steps: Vec::new(),
            status: PlanStatus::Pending,
            current_step: 0,
            parallel: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn single(command: impl Into<String>, step: PlanStep) -> Self {
        Self::new(command).with_steps(vec![step])
    }

    pub fn with_steps(mut self, steps: Vec<PlanStep>) -> Self {
        self.steps = steps;
        self
    }

    pub fn all_completed(&self) -> bool {
        self.steps
            .iter()
            .all(|s| s.status == PlanStepStatus::Completed)
    }

    /// Get count of completed steps
    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == PlanStepStatus::Completed)
            .count()
    }

    pub fn failed_step(&self) -> Option<(usize, &PlanStep)> {
        self.steps
            .iter()
            .enumerate()
            .find(|(_, s)| s.status == PlanStepStatus::Failed)
    }

    /// Generate a summary of the plan
    pub fn summary(&self) -> String {
        let completed = self.completed_count();
        let total = self.steps.len();

        match self.failed_step() {
            Some((i, step)) => format!(
                "{}/{} steps completed, step {} ({}) failed",
                completed,
                total,
                i + 1,
                step.action
            ),
            None => format!("{}/{} steps completed", completed, total),
        }
    }
}

/// Events emitted during plan execution
#[derive(Debug, Clone)]
pub enum PlanEvent {
    StepStarted {
        plan_id: String,
        index: usize,
        action: String,
    },
    StepCompleted {
        plan_id: String,
        index: usize,
        success: bool,
        error: Option<String>,
    },
    PlanCompleted {
        plan_id: String,
        success: bool,
        summary: String,
    },
}
