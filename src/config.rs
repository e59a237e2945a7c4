use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub splitter: SplitterConfig,
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub tools: ToolConfig,
}

/// Configuration for tool execution limits and behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Directory file and shell tools operate in (default: current directory)
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Default timeout for shell commands in seconds (default: 120)
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,

    /// Maximum output size in bytes before truncation (default: 1MB)
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Block commands matching `dangerous_patterns` (default: true)
    #[serde(default = "default_true")]
    pub warn_dangerous_commands: bool,

    /// List of command patterns to block (regexes)
    #[serde(default = "default_dangerous_patterns")]
    pub dangerous_patterns: Vec<String>,

    /// Base URL of the plain-text weather service
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_shell_timeout() -> u64 {
    120
}

fn default_max_output_bytes() -> usize {
    1_048_576 // 1MB
}

fn default_dangerous_patterns() -> Vec<String> {
    vec![
        r"rm\s+-rf\s+/".to_string(),
        r"rm\s+-rf\s+~".to_string(),
        r":()\s*\{\s*:\|\:&\s*\}".to_string(), // Fork bomb
        r"dd\s+if=.*of=/dev/".to_string(),
        r"mkfs\.".to_string(),
        r">\s*/dev/sd".to_string(),
        r"chmod\s+-R\s+777\s+/".to_string(),
    ]
}

fn default_weather_base_url() -> String {
    "https://wttr.in".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            shell_timeout_secs: default_shell_timeout(),
            max_output_bytes: default_max_output_bytes(),
            warn_dangerous_commands: true,
            dangerous_patterns: default_dangerous_patterns(),
            weather_base_url: default_weather_base_url(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Consult the external planner before the heuristic fallback
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Base URL for API (optional, for Ollama or custom endpoints)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Upper bound on the single planning request
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> usize {
    1024
}

fn default_llm_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Ollama,
}

impl LlmProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "https://api.openai.com/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
        }
    }
}

impl LlmConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    /// Configured key first, then the provider's environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| match self.provider {
            LlmProvider::OpenAI => std::env::var("OPENAI_API_KEY").ok(),
            LlmProvider::Ollama => None,
        })
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: LlmProvider::default(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Single-token separator words, matched case-insensitively
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

fn default_separators() -> Vec<String> {
    ["and", "then", "after", "next", "subsequently"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            separators: default_separators(),
        }
    }
}

/// One entry of an interpreter pattern table.
///
/// `params` names the capture groups in order; a group that did not
/// participate in the match is left out of the operation's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    pub action: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl PatternRule {
    pub fn new(pattern: &str, action: &str, params: &[&str]) -> Self {
        Self {
            pattern: pattern.to_string(),
            action: action.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<PatternRule>,
    #[serde(default = "default_system_patterns")]
    pub system_patterns: Vec<PatternRule>,
    #[serde(default = "default_shell_patterns")]
    pub shell_patterns: Vec<PatternRule>,
}

fn default_file_patterns() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            r"(?i)^(?:create|make|touch)\s+(?:a\s+)?(?:new\s+)?file\s+(?:named\s+|called\s+)?(\S+)$",
            "create",
            &["filename"],
        ),
        PatternRule::new(
            r"(?i)^write\s+(.+?)\s+(?:to|into)\s+(?:file\s+)?(\S+)$",
            "write",
            &["content", "filename"],
        ),
        PatternRule::new(
            r"(?i)^append\s+(.+?)\s+to\s+(?:file\s+)?(\S+)$",
            "append",
            &["content", "filename"],
        ),
        PatternRule::new(
            r"(?i)^(?:read|show|display|cat|open)\s+(?:the\s+)?file\s+(\S+)$",
            "read",
            &["filename"],
        ),
        PatternRule::new(
            r"(?i)^(?:delete|remove)\s+(?:the\s+)?file\s+(\S+)$",
            "delete",
            &["filename"],
        ),
        PatternRule::new(
            r"(?i)^(?:find|search\s+for)\s+files?\s+(?:named\s+|matching\s+)?(\S+)(?:\s+in\s+(\S+))?$",
            "search",
            &["search_term", "directory"],
        ),
        PatternRule::new(
            r"(?i)^list\s+(?:the\s+)?files(?:\s+in\s+(\S+))?$",
            "list",
            &["directory"],
        ),
    ]
}

fn default_system_patterns() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            r"(?i)^(?:show|get|display)\s+(?:the\s+)?system\s+info(?:rmation)?$",
            "info",
            &[],
        ),
        PatternRule::new(
            r"(?i)^(?:check|show)\s+(disk|memory)\s+usage$",
            "usage",
            &["resource"],
        ),
        PatternRule::new(
            r"(?i)^(?:list|show)\s+(?:running\s+)?processes$",
            "processes",
            &[],
        ),
    ]
}

fn default_shell_patterns() -> Vec<PatternRule> {
    vec![
        PatternRule::new(r"^!\s*(.+)$", "execute", &["command"]),
        PatternRule::new(
            r"(?i)^(?:run|execute)\s+(?:the\s+)?(?:command\s+)?(.+)$",
            "execute",
            &["command"],
        ),
    ]
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            file_patterns: default_file_patterns(),
            system_patterns: default_system_patterns(),
            shell_patterns: default_shell_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Verbs that mark a named-application launch on the fast path
    #[serde(default = "default_launch_keywords")]
    pub launch_keywords: Vec<String>,
    /// Applications the fast path recognises after a launch keyword
    #[serde(default = "default_known_apps")]
    pub known_apps: Vec<String>,
}

fn default_launch_keywords() -> Vec<String> {
    ["open", "launch", "start"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_known_apps() -> Vec<String> {
    [
        "firefox",
        "chrome",
        "chromium",
        "terminal",
        "code",
        "spotify",
        "calculator",
        "notepad",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            launch_keywords: default_launch_keywords(),
            known_apps: default_known_apps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Answer unknown actions with the canned default tool instead of failing
    #[serde(default = "default_true")]
    pub default_tool: bool,
    /// Inputs the default tool answers with a greeting
    #[serde(default = "default_greetings")]
    pub greetings: Vec<String>,
    /// Upper bound on a single step (default: 300)
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,
}

fn default_greetings() -> Vec<String> {
    ["hi", "hello", "hey", "good morning", "good evening"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_step_timeout() -> u64 {
    300
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_tool: true,
            greetings: default_greetings(),
            step_timeout_secs: default_step_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// When set, every entry is also written as one JSON file here
    #[serde(default)]
    pub persist_dir: Option<PathBuf>,
}

fn default_max_history() -> usize {
    100
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            persist_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Write the default configuration to `config_path` unless a file is
    /// already there. Returns whether a file was written.
    pub fn write_default_if_missing(config_path: &Path) -> Result<bool> {
        if config_path.exists() {
            return Ok(false);
        }
        Self::default().save_to(config_path)?;
        Ok(true)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("nl-orchestrator").join("config.toml"))
    }
}
