use anyhow::Result;
use nl_orchestrator::persistence::{AgentState, HistoryStore};
use serde_json::json;

use crate::common::TestEnvironment;

#[tokio::test]
async fn test_history_is_bounded_but_fully_persisted() -> Result<()> {
    let env = TestEnvironment::new()?;
    let history_dir = env.project_path.join("history");
    let mut config = env.config();
    config.history.max_history = 2;
    config.history.persist_dir = Some(history_dir.clone());

    let mut agent = nl_orchestrator::Agent::new(config)?;
    for word in ["one", "two", "three"] {
        agent.handle(word).await;
    }

    let in_memory: Vec<&str> = agent
        .history()
        .get(None)
        .iter()
        .map(|e| e.command.as_str())
        .collect();
    assert_eq!(in_memory, vec!["two", "three"]);

    let stored = HistoryStore::new(&history_dir).load(None)?;
    let commands: Vec<&str> = stored.iter().map(|e| e.command.as_str()).collect();
    assert_eq!(commands, vec!["one", "two", "three"]);
    assert_eq!(stored[2].result, json!("three"));
    assert_eq!(stored[2].step_number, 3);

    let latest = HistoryStore::new(&history_dir).load(Some(1))?;
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].command, "three");
    Ok(())
}

#[tokio::test]
async fn test_failed_step_is_recorded_with_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mut agent = env.agent()?;

    agent.run_sequence("read file nothing.txt").await;

    let entries = agent.history().get(None);
    assert_eq!(entries.len(), 1);
    assert!(entries[0].result["error"]
        .as_str()
        .unwrap_or_default()
        .contains("nothing.txt"));
    Ok(())
}

#[tokio::test]
async fn test_agent_state_excludes_registry() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mut agent = env.agent()?;
    agent.handle("hello").await;

    let path = env.project_path.join("agent.json");
    agent.save_state(&path)?;

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    let keys: Vec<&String> = raw.as_object().expect("object").keys().collect();
    assert_eq!(keys.len(), 5);
    for key in ["agent_id", "steps", "context", "created_at", "updated_at"] {
        assert!(raw.get(key).is_some(), "missing {}", key);
    }

    let state = AgentState::load(&path)?;
    assert_eq!(state.steps[0].result, json!("hello"));
    Ok(())
}
