use anyhow::Result;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use nl_orchestrator::config::ToolConfig;
use nl_orchestrator::error::{ErrorCategory, ToolError};
use nl_orchestrator::tools::{ToolContext, ToolRegistry};
use predicates::prelude::*;
use serde_json::json;

fn tool_config(dir: &TempDir) -> ToolConfig {
    ToolConfig {
        working_dir: dir.path().to_path_buf(),
        ..ToolConfig::default()
    }
}

#[tokio::test]
async fn test_file_tool_through_registry() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = tool_config(&temp_dir);
    let ctx = ToolContext::from_config(&config);
    let registry = ToolRegistry::with_builtin_tools();

    registry
        .execute_tool(
            "file",
            json!({"action": "write", "filename": "docs/readme.md", "content": "# Title"}),
            &ctx,
        )
        .await?;
    temp_dir
        .child("docs/readme.md")
        .assert(predicate::str::starts_with("# Title"));

    let found = registry
        .execute_tool("file", json!({"action": "search", "search_term": "readme"}), &ctx)
        .await?;
    assert!(found.as_str().unwrap_or_default().contains("readme.md"));

    registry
        .execute_tool("file", json!({"action": "delete", "filename": "docs/readme.md"}), &ctx)
        .await?;
    temp_dir.child("docs/readme.md").assert(predicate::path::missing());
    Ok(())
}

#[tokio::test]
async fn test_error_categories() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = tool_config(&temp_dir);
    let ctx = ToolContext::from_config(&config);
    let registry = ToolRegistry::with_builtin_tools();

    let blocked = registry
        .execute_tool("shell", json!({"command": "rm -rf /"}), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(blocked, ToolError::Blocked(_)));
    assert_eq!(blocked.category(), ErrorCategory::Security);

    let unknown = registry
        .execute_tool("file", json!({"action": "shred"}), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(unknown, ToolError::UnknownAction { .. }));

    let mismatch = registry
        .execute_tool("calculator", json!(["1 + 1"]), &ctx)
        .await
        .unwrap_err();
    assert!(mismatch.to_string().contains("calculator"));
    Ok(())
}

#[tokio::test]
async fn test_memory_tool_shares_facts_across_calls() -> Result<()> {
    let config = ToolConfig::default();
    let ctx = ToolContext::from_config(&config);
    let registry = ToolRegistry::with_builtin_tools();

    registry
        .execute_tool("memory", json!({"action": "remember", "fact": "milk is low"}), &ctx)
        .await?;
    let recalled = registry
        .execute_tool("memory", json!({"action": "recall"}), &ctx)
        .await?;
    assert!(recalled.to_string().contains("milk is low"));
    Ok(())
}

#[tokio::test]
async fn test_calculator_and_datetime() -> Result<()> {
    let config = ToolConfig::default();
    let ctx = ToolContext::from_config(&config);
    let registry = ToolRegistry::with_builtin_tools();

    let sum = registry
        .execute_tool("calculator", json!({"expression": "(1 + 2) * 3"}), &ctx)
        .await?;
    assert_eq!(sum, json!("(1 + 2) * 3 = 9"));

    let err = registry
        .execute_tool("calculator", json!({"expression": "1 / 0"}), &ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Division by zero"));

    let time = registry
        .execute_tool("datetime", json!({"action": "time"}), &ctx)
        .await?;
    assert!(time.as_str().unwrap_or_default().starts_with("It is "));
    Ok(())
}
