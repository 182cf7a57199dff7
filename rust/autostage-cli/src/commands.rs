//! Subcommand bodies, writing to any `Write` so they can be exercised
//! without a terminal.

use std::io::Write;

use autostage_builtins::convert::tensor_to_value;
use autostage_builtins::{execute, registry, Scope, Value};
use autostage_graph::{Graph, Session, Symbolic};
use tracing::{debug, info};

use crate::bindings::{build_feeds, parse_binding, PlaceholderSpec};
use crate::config::AutostageConfig;
use crate::CliError;

/// Inputs of `autostage eval`.
#[derive(Debug, Clone, Default)]
pub struct EvalRequest {
    pub source: String,
    pub lets: Vec<String>,
    pub placeholders: Vec<String>,
    pub feeds: Vec<String>,
}

/// Bind, evaluate and report. Staged results are optionally rendered as a
/// graph and run with the feeds.
pub fn eval(request: &EvalRequest, config: &AutostageConfig, out: &mut dyn Write) -> Result<(), CliError> {
    let graph = Graph::new();
    let globals = Scope::new();
    for text in &request.lets {
        let (name, value) = parse_binding(text)?;
        globals.set(name, value);
    }
    let mut declared: Vec<(PlaceholderSpec, Symbolic)> = Vec::new();
    for text in &request.placeholders {
        let spec = PlaceholderSpec::parse(text)?;
        let sym = spec.declare(&graph);
        debug!(name = %spec.name, dtype = %spec.dtype, shape = %spec.shape, "placeholder");
        globals.set(spec.name.clone(), Value::Tensor(sym.clone()));
        declared.push((spec, sym));
    }
    let feeds = build_feeds(&request.feeds, &declared)?;

    let result = execute(&request.source, &globals, &Scope::new())?;
    writeln!(out, "{}", result.repr())?;

    let fetch = match &result {
        Value::Tensor(sym) => sym.clone(),
        Value::TensorArray(buffer) => buffer.handle().clone(),
        Value::Dataset(source) => {
            for element in source.iter() {
                let parts: Vec<Value> = element.iter().map(tensor_to_value).collect();
                let rendered = match parts.as_slice() {
                    [single] => single.repr(),
                    _ => Value::Tuple(parts).repr(),
                };
                writeln!(out, "  {}", rendered)?;
            }
            return Ok(());
        }
        _ => return Ok(()),
    };

    if config.eval.show_graph {
        write!(out, "{}", fetch.graph())?;
    }
    if config.eval.run_staged {
        info!(node = %fetch.id(), "running staged result");
        let tensor = Session::run(&fetch, feeds)?;
        writeln!(out, "=> {}", tensor_to_value(&tensor).repr())?;
    }
    Ok(())
}

/// One line per registered overload.
pub fn builtins(out: &mut dyn Write) -> Result<(), CliError> {
    for entry in registry() {
        writeln!(out, "{:<10} {}", entry.builtin.name(), entry.name)?;
    }
    Ok(())
}
