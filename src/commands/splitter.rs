use std::collections::HashSet;

use crate::config::SplitterConfig;

/// Splits a raw utterance into ordered command segments on separator words.
///
/// Separators are matched one whitespace token at a time, so a multi-word
/// separator such as "followed by" never matches.
#[derive(Debug, Clone)]
pub struct CommandSplitter {
    separators: HashSet<String>,
}

impl CommandSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self {
            separators: config
                .separators
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    pub fn is_separator(&self, token: &str) -> bool {
        self.separators.contains(&token.to_lowercase())
    }

    /// Split `raw` into segments, never returning an empty one
    pub fn split(&self, raw: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for token in raw.split_whitespace() {
            if self.is_separator(token) {
                if !current.is_empty() {
                    segments.push(current.join(" "));
                    current.clear();
                }
            } else {
                current.push(token);
            }
        }

        if !current.is_empty() {
            segments.push(current.join(" "));
        }

        segments
    }
}

impl Default for CommandSplitter {
    fn default() -> Self {
        Self::new(SplitterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_and() {
        let splitter = CommandSplitter::default();
        assert_eq!(
            splitter.split("create file test.txt and read file test.txt"),
            vec!["create file test.txt", "read file test.txt"]
        );
    }

    #[test]
    fn test_separators_case_insensitive() {
        let splitter = CommandSplitter::default();
        assert_eq!(
            splitter.split("list files THEN show system info"),
            vec!["list files", "show system info"]
        );
    }

    #[test]
    fn test_consecutive_separators_skip_empty_segments() {
        let splitter = CommandSplitter::default();
        assert_eq!(
            splitter.split("and then echo hi and and then next echo bye then"),
            vec!["echo hi", "echo bye"]
        );
        assert!(splitter.split("and then").is_empty());
        assert!(splitter.split("   ").is_empty());
    }

    #[test]
    fn test_multi_word_separator_does_not_match() {
        let splitter = CommandSplitter::new(SplitterConfig {
            separators: vec!["followed by".to_string()],
        });
        assert_eq!(
            splitter.split("echo a followed by echo b"),
            vec!["echo a followed by echo b"]
        );
    }

    #[test]
    fn test_segments_are_subsequence_of_tokens() {
        let splitter = CommandSplitter::default();
        let inputs = [
            "open firefox and then after that next search",
            "a  b\tand c\nthen d",
            "subsequently",
            "x and",
        ];
        for input in inputs {
            let tokens: Vec<&str> = input.split_whitespace().collect();
            let segments = splitter.split(input);
            assert!(segments.iter().all(|s| !s.is_empty()));

            let rejoined: Vec<String> = segments
                .iter()
                .flat_map(|s| s.split_whitespace().map(str::to_string))
                .collect();
            let mut cursor = tokens.iter();
            for token in &rejoined {
                assert!(cursor.any(|t| t == token), "{} out of order in {}", token, input);
            }
        }
    }
}
