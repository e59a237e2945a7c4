use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{InterpreterConfig, PatternRule};
use crate::error::ConfigError;
use crate::planning::PlanStep;
use crate::tools::ACTION_KEY;

/// Closed set of operation families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    File,
    System,
    Shell,
    Browser,
    Language,
    Utility,
    Plugin,
    Error,
}

impl OperationKind {
    /// Name of the tool that carries out operations of this family
    pub fn tool_name(&self) -> &'static str {
        match self {
            OperationKind::File => "file",
            OperationKind::System => "system",
            OperationKind::Shell => "shell",
            OperationKind::Browser => "browser",
            OperationKind::Language => "language",
            OperationKind::Utility => "utility",
            OperationKind::Plugin => "plugin",
            OperationKind::Error => "error",
        }
    }
}

/// A classified command segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub action: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Operation {
    pub fn shell(command: &str) -> Self {
        let mut parameters = Map::new();
        parameters.insert("command".to_string(), Value::String(command.to_string()));
        Self {
            kind: OperationKind::Shell,
            action: "execute".to_string(),
            parameters,
        }
    }

    /// Convert into a pending plan step addressed to the family's tool
    pub fn into_step(self) -> PlanStep {
        let mut parameters = self.parameters;
        parameters.insert(ACTION_KEY.to_string(), Value::String(self.action));
        PlanStep::new(self.kind.tool_name(), parameters)
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    action: String,
    params: Vec<String>,
}

impl CompiledRule {
    fn compile(rule: &PatternRule) -> Result<Self, ConfigError> {
        let regex = Regex::new(&rule.pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: rule.pattern.clone(),
            source,
        })?;
        Ok(Self {
            regex,
            action: rule.action.clone(),
            params: rule.params.clone(),
        })
    }
}

/// Classifies a segment against ordered pattern tables (file, system, shell).
///
/// First match wins. Anything unmatched becomes a shell `execute`.
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    tables: Vec<(OperationKind, Vec<CompiledRule>)>,
}

impl CommandInterpreter {
    pub fn new(config: InterpreterConfig) -> Result<Self, ConfigError> {
        let compile = |rules: &[PatternRule]| -> Result<Vec<CompiledRule>, ConfigError> {
            rules.iter().map(CompiledRule::compile).collect()
        };

        Ok(Self {
            tables: vec![
                (OperationKind::File, compile(&config.file_patterns)?),
                (OperationKind::System, compile(&config.system_patterns)?),
                (OperationKind::Shell, compile(&config.shell_patterns)?),
            ],
        })
    }

    /// Order in which families are consulted
    pub fn families(&self) -> Vec<OperationKind> {
        self.tables.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn classify(&self, segment: &str) -> Operation {
        let segment = segment.trim();

        for (kind, rules) in &self.tables {
            for rule in rules {
                let Some(captures) = rule.regex.captures(segment) else {
                    continue;
                };

                let mut parameters = Map::new();
                for (i, name) in rule.params.iter().enumerate() {
                    if let Some(m) = captures.get(i + 1) {
                        parameters.insert(name.clone(), Value::String(m.as_str().to_string()));
                    }
                }

                tracing::debug!("Classified '{}' as {:?}/{}", segment, kind, rule.action);
                return Operation {
                    kind: *kind,
                    action: rule.action.clone(),
                    parameters,
                };
            }
        }

        Operation::shell(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> CommandInterpreter {
        CommandInterpreter::new(InterpreterConfig::default()).unwrap()
    }

    #[test]
    fn test_file_operations() {
        let interp = interpreter();

        let op = interp.classify("create file test.txt");
        assert_eq!(op.kind, OperationKind::File);
        assert_eq!(op.action, "create");
        assert_eq!(op.parameters["filename"], "test.txt");

        let op = interp.classify("Read file test.txt");
        assert_eq!(op.kind, OperationKind::File);
        assert_eq!(op.action, "read");
        assert_eq!(op.parameters["filename"], "test.txt");

        let op = interp.classify("write hello world to notes.md");
        assert_eq!(op.action, "write");
        assert_eq!(op.parameters["content"], "hello world");
        assert_eq!(op.parameters["filename"], "notes.md");
    }

    #[test]
    fn test_optional_group_is_omitted() {
        let op = interpreter().classify("list files");
        assert_eq!(op.kind, OperationKind::File);
        assert_eq!(op.action, "list");
        assert!(op.parameters.is_empty());

        let op = interpreter().classify("list files in src");
        assert_eq!(op.parameters["directory"], "src");
    }

    #[test]
    fn test_system_and_shell() {
        let interp = interpreter();

        let op = interp.classify("show system info");
        assert_eq!(op.kind, OperationKind::System);
        assert_eq!(op.action, "info");

        let op = interp.classify("run cargo --version");
        assert_eq!(op.kind, OperationKind::Shell);
        assert_eq!(op.parameters["command"], "cargo --version");
    }

    #[test]
    fn test_unmatched_falls_back_to_shell() {
        let op = interpreter().classify("ls -la /tmp");
        assert_eq!(op, Operation::shell("ls -la /tmp"));
    }

    #[test]
    fn test_first_match_wins_across_tables() {
        // "run" would match the shell table too, but file comes first
        let config = InterpreterConfig {
            file_patterns: vec![PatternRule::new(r"^run (\S+)$", "read", &["filename"])],
            ..InterpreterConfig::default()
        };
        let op = CommandInterpreter::new(config).unwrap().classify("run x.txt");
        assert_eq!(op.kind, OperationKind::File);
        assert_eq!(interpreter().families()[0], OperationKind::File);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = InterpreterConfig {
            shell_patterns: vec![PatternRule::new("(unclosed", "execute", &[])],
            ..InterpreterConfig::default()
        };
        assert!(matches!(
            CommandInterpreter::new(config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_into_step_carries_action_key() {
        let step = interpreter().classify("delete file old.log").into_step();
        assert_eq!(step.action, "file");
        assert_eq!(step.parameters[ACTION_KEY], "delete");
        assert_eq!(step.parameters["filename"], "old.log");
    }

    #[test]
    fn test_operation_serializes_type_field() {
        let json = serde_json::to_value(Operation::shell("pwd")).unwrap();
        assert_eq!(json["type"], "shell");
        assert_eq!(json["action"], "execute");
    }
}
