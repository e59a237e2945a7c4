use anyhow::Result;
use assert_fs::prelude::*;
use nl_orchestrator::config::LlmProvider;
use nl_orchestrator::{Agent, Config, ResultEnvelope};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::TestEnvironment;

fn llm_config(env: &TestEnvironment, server: &MockServer) -> Config {
    let mut config = env.config();
    config.llm.enabled = true;
    config.llm.provider = LlmProvider::OpenAI;
    config.llm.base_url = Some(server.uri());
    config.llm.api_key = Some("test-key".to_string());
    config.llm.timeout_secs = 5;
    config
}

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn test_llm_plan_drives_execution() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.temp_dir.child("inbox.md").touch()?;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        // The prompt lists registered tools
        .and(body_string_contains("calculator"))
        .respond_with(reply(
            "Here you go:\n```json\n{\"tool\": \"file\", \"action\": \"list\", \"params\": {}}\n```",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut agent = Agent::new(llm_config(&env, &server))?;
    assert!(agent.planner().stage_names().contains(&"llm"));

    let outcome = agent.handle("what files do I have").await;

    assert!(outcome.is_success());
    assert_eq!(outcome.envelope, ResultEnvelope::Output(json!("inbox.md")));
    assert_eq!(outcome.plan.expect("plan").steps[0].action, "file");
    Ok(())
}

#[tokio::test]
async fn test_llm_error_falls_back_to_heuristics() -> Result<()> {
    let env = TestEnvironment::new()?;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let mut agent = Agent::new(llm_config(&env, &server))?;
    let outcome = agent.handle("calculate 2 ^ 10").await;

    assert_eq!(outcome.envelope, ResultEnvelope::Output(json!("2 ^ 10 = 1024")));
    Ok(())
}

#[tokio::test]
async fn test_llm_without_tool_falls_back_to_echo() -> Result<()> {
    let env = TestEnvironment::new()?;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply(r#"{"tool": "", "action": ""}"#))
        .mount(&server)
        .await;

    let mut agent = Agent::new(llm_config(&env, &server))?;
    let outcome = agent.handle("tell me a story").await;

    assert_eq!(outcome.envelope, ResultEnvelope::Output(json!("tell me a story")));
    assert_eq!(outcome.plan.expect("plan").steps[0].action, "echo");
    Ok(())
}

#[tokio::test]
async fn test_fast_path_skips_llm() -> Result<()> {
    let env = TestEnvironment::new()?;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply(r#"{"tool": "echo", "action": "execute"}"#))
        .expect(0)
        .mount(&server)
        .await;

    let mut agent = Agent::new(llm_config(&env, &server))?;
    let outcome = agent.handle("move the mouse to the corner").await;

    // No desktop tool is bundled, so the default tool answers
    assert_eq!(
        outcome.envelope,
        ResultEnvelope::Output(json!("Sorry, I didn't understand 'move the mouse to the corner'."))
    );
    Ok(())
}
