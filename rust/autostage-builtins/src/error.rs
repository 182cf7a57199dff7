use autostage_graph::{ExecError, GraphError};
use thiserror::Error;

/// Failures raised by the builtin overlay and the context evaluator.
///
/// `Type` and `Value` mirror the host builtins' own failures. `Graph`
/// failures happen while a staged value is being built; `Execution`
/// failures only appear once the staged graph is run.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ValueError: {0}")]
    Value(String),
    #[error("{0}")]
    Validation(String),
    #[error("not supported: {0}")]
    Unsupported(String),
    #[error("cannot resolve the frame {requested} levels up: the stack is only {depth} deep")]
    FrameResolution { requested: usize, depth: usize },
    #[error("NameError: name '{0}' is not defined")]
    Name(String),
    #[error("SyntaxError: {0}")]
    Syntax(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Execution(#[from] ExecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuiltinError {
    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        BuiltinError::Type(msg.into())
    }

    pub(crate) fn value_error(msg: impl Into<String>) -> Self {
        BuiltinError::Value(msg.into())
    }

    /// True for failures that surfaced while running a staged graph.
    pub fn is_execution_time(&self) -> bool {
        matches!(self, BuiltinError::Execution(_))
    }
}
