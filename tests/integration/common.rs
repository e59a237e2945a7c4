use anyhow::Result;
use assert_fs::TempDir;
use nl_orchestrator::{Agent, Config};
use std::path::PathBuf;

/// Test utilities for integration tests
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub project_path: PathBuf,
}

impl TestEnvironment {
    /// Create a new test environment with a temporary working directory
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_path = temp_dir.path().to_path_buf();
        Ok(Self {
            temp_dir,
            project_path,
        })
    }

    /// Configuration whose tools operate inside the temp directory
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.tools.working_dir = self.project_path.clone();
        config
    }

    pub fn agent(&self) -> Result<Agent> {
        Agent::new(self.config())
    }
}
