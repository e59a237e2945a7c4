use anyhow::Result;
use assert_fs::prelude::*;
use nl_orchestrator::commands::{CommandInterpreter, CommandSplitter, OperationKind};
use nl_orchestrator::config::{ExecutorConfig, InterpreterConfig, ToolConfig};
use nl_orchestrator::extraction::{ResponseExtractor, CONFIDENCE};
use nl_orchestrator::planning::{
    MultiStepPlan, PlanExecutor, PlanStatus, PlanStep, PlanStepStatus,
};
use nl_orchestrator::tools::default::GREETING;
use nl_orchestrator::tools::{FnTool, ToolContext, ToolRegistry};
use nl_orchestrator::{normalize, OutcomeStatus, ResultEnvelope};
use predicates::prelude::*;
use serde_json::json;

use crate::common::TestEnvironment;

#[tokio::test]
async fn test_create_and_read_sequence() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = "create file test.txt and read file test.txt";

    let segments = CommandSplitter::default().split(input);
    assert_eq!(segments, vec!["create file test.txt", "read file test.txt"]);

    let interpreter = CommandInterpreter::new(InterpreterConfig::default())?;
    for segment in &segments {
        assert_eq!(interpreter.classify(segment).kind, OperationKind::File);
    }

    let mut agent = env.agent()?;
    let outcome = agent.run_sequence(input).await;

    assert_eq!(outcome.status, OutcomeStatus::Success);
    env.temp_dir.child("test.txt").assert(predicate::path::exists());
    let plan = outcome.plan.expect("sequence produces a plan");
    assert_eq!(plan.status, PlanStatus::Completed);
    assert!(plan.steps.iter().all(|s| s.status == PlanStepStatus::Completed));
    Ok(())
}

#[tokio::test]
async fn test_write_then_append_file_contents() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mut agent = env.agent()?;

    let outcome = agent
        .run_sequence("write first line to log.txt then append second line to log.txt")
        .await;

    assert!(outcome.is_success());
    env.temp_dir
        .child("log.txt")
        .assert(predicate::str::diff("first line\nsecond line\n"));
    Ok(())
}

#[test]
fn test_fenced_command_extraction() {
    let text = "Sure:\n```json\n{\"command\": \"ls -la\", \"explanation\": \"list files\"}\n```";
    let extraction = ResponseExtractor::new().extract(text);

    assert!(extraction.success);
    assert_eq!(extraction.command.as_deref(), Some("ls -la"));
    assert_eq!(extraction.metadata.explanation, Some(json!("list files")));
    assert_eq!(extraction.metadata.confidence, Some(CONFIDENCE));
    assert_eq!(extraction.metadata.raw_text, text);
}

#[test]
fn test_file_operation_without_content_is_touch() {
    let extraction = ResponseExtractor::new()
        .extract(r#"{"file_operation":"create","operation_params":{"filename":"a.txt"}}"#);
    assert!(extraction.success);
    assert_eq!(extraction.command.as_deref(), Some("touch 'a.txt'"));
}

#[test]
fn test_file_operation_missing_filename_fails_closed() {
    let extraction = ResponseExtractor::new()
        .extract(r#"{"file_operation":"delete","operation_params":{}}"#);
    assert!(!extraction.success);
    assert!(extraction.command.is_none());
    assert!(extraction.metadata.is_error);
}

#[tokio::test]
async fn test_unknown_action_without_default_tool() {
    let tools = ToolConfig::default();
    let ctx = ToolContext::from_config(&tools);
    let executor = PlanExecutor::new(&ExecutorConfig {
        default_tool: false,
        ..ExecutorConfig::default()
    });

    let mut plan = MultiStepPlan::single("fly", PlanStep::with_params("fly", json!({})));
    let result = executor
        .execute(&mut plan, &ToolRegistry::with_builtin_tools(), &ctx)
        .await;

    assert_eq!(plan.steps[0].error.as_deref(), Some("Unknown action: fly"));
    assert_eq!(plan.status, PlanStatus::Failed);
    assert_eq!(normalize(&result), ResultEnvelope::Error("Unknown action: fly".into()));
}

#[test]
fn test_true_normalizes_to_greeting() {
    assert_eq!(normalize(&json!(true)), ResultEnvelope::Output(json!(GREETING)));
}

#[tokio::test]
async fn test_short_circuit_law() {
    let tools = ToolConfig::default();
    let ctx = ToolContext::from_config(&tools);
    let mut registry = ToolRegistry::new();
    registry.register_callable(FnTool::new("step", "", |p| Ok(p["i"].clone())));
    registry.register_callable(FnTool::new("fail", "", |_| anyhow::bail!("nope")));
    let executor = PlanExecutor::new(&ExecutorConfig::default());

    let n = 5;
    for k in 0..n {
        let steps = (0..n)
            .map(|i| PlanStep::with_params(if i == k { "fail" } else { "step" }, json!({ "i": i })))
            .collect();
        let mut plan = MultiStepPlan::new("law").with_steps(steps);

        executor.execute(&mut plan, &registry, &ctx).await;

        assert_eq!(plan.status, PlanStatus::Failed);
        assert!(plan.steps[..k].iter().all(|s| s.status == PlanStepStatus::Completed));
        assert_eq!(plan.steps[k].status, PlanStepStatus::Failed);
        assert!(plan.steps[k + 1..].iter().all(|s| s.status == PlanStepStatus::Pending));
        assert!(plan.steps[k + 1..].iter().all(|s| s.result.is_none()));
    }
}

#[tokio::test]
async fn test_unmatched_segment_runs_as_shell() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.temp_dir.child("marker.txt").touch()?;
    let mut agent = env.agent()?;

    let outcome = agent.run_sequence("ls").await;

    assert!(outcome.is_success());
    assert!(outcome.envelope.text().contains("marker.txt"));
    let plan = outcome.plan.expect("plan");
    assert_eq!(plan.steps[0].action, "shell");
    Ok(())
}

#[tokio::test]
async fn test_ai_response_executes_in_working_dir() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mut agent = env.agent()?;

    let outcome = agent
        .run_ai_response(r#"{"file_operation":"write","operation_params":{"filename":"q.txt","content":"it's here"}}"#)
        .await;

    assert!(outcome.is_success());
    env.temp_dir
        .child("q.txt")
        .assert(predicate::str::contains("it's here"));
    Ok(())
}
