//! autostage CLI: evaluates builtin calls natively or staged against
//! placeholders.

pub mod bindings;
pub mod commands;
pub mod config;

use std::path::PathBuf;

use autostage_builtins::BuiltinError;
use autostage_graph::ExecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid {kind} '{text}': {reason}")]
    InvalidBinding {
        kind: &'static str,
        text: String,
        reason: String,
    },
    #[error("no placeholder named '{0}' to feed")]
    UnknownPlaceholder(String),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid toml in '{path}': {source}")]
    ParseConfig {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Builtin(#[from] BuiltinError),
    #[error(transparent)]
    Execution(#[from] ExecError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
