//! Configuration file parsing for `autostage.toml`.
//!
//! Searches the current directory then its ancestors. A missing file means
//! defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::CliError;

pub const CONFIG_FILE: &str = "autostage.toml";

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct AutostageConfig {
    #[serde(default)]
    pub log: LogSection,
    #[serde(default)]
    pub eval: EvalSection,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct LogSection {
    /// `tracing` filter directives, e.g. `autostage_builtins=debug`.
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EvalSection {
    /// Print the staged graph after evaluation.
    #[serde(default)]
    pub show_graph: bool,
    /// Execute staged results with the reference engine.
    #[serde(default = "default_true")]
    pub run_staged: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EvalSection {
    fn default() -> Self {
        EvalSection {
            show_graph: false,
            run_staged: true,
        }
    }
}

impl AutostageConfig {
    /// Load `explicit` when given, else the first `autostage.toml` found
    /// from the current directory upward, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let found = std::env::current_dir()
            .ok()
            .and_then(|dir| Self::discover(&dir));
        match found {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// The nearest `autostage.toml` at or above `start`.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    pub fn load_from(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `RUST_LOG` wins over the config file, which wins over the default.
    pub fn log_filter(&self, env: Option<String>) -> String {
        env.filter(|s| !s.trim().is_empty())
            .or_else(|| self.log.filter.clone())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg: AutostageConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, AutostageConfig::default());
        assert!(cfg.eval.run_staged);
        assert!(!cfg.eval.show_graph);
    }

    #[test]
    fn sections_parse() {
        let cfg: AutostageConfig = toml::from_str(
            r#"
[log]
filter = "autostage_builtins=debug"

[eval]
show_graph = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.log.filter.as_deref(), Some("autostage_builtins=debug"));
        assert!(cfg.eval.show_graph);
        assert!(cfg.eval.run_staged);
    }

    #[test]
    fn log_filter_precedence() {
        let mut cfg = AutostageConfig::default();
        assert_eq!(cfg.log_filter(None), "warn");
        cfg.log.filter = Some("info".into());
        assert_eq!(cfg.log_filter(None), "info");
        assert_eq!(cfg.log_filter(Some("trace".into())), "trace");
        assert_eq!(cfg.log_filter(Some(" ".into())), "info");
    }
}
