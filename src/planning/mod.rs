//! Planning and execution
//!
//! The planner turns a command into a [`MultiStepPlan`]; the executor runs
//! it against the tool registry.

pub mod executor;
pub mod planner;
pub mod types;

pub use executor::{PlanExecutor, PLUGIN_ACTION};
pub use planner::{
    HeuristicRule, HttpLlmPlanner, LlmPlan, LlmPlanner, PlanContext, Planner, PlanningStage,
    Plugin, AVAILABLE_TOOLS_KEY,
};
pub use types::{MultiStepPlan, PlanEvent, PlanStatus, PlanStep, PlanStepStatus};
