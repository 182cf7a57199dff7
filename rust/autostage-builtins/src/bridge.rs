//! Host callback bridge for staged `print`.

use autostage_graph::{HostCallback, Symbolic, Tensor};
use tracing::debug;

use crate::classify::staged_handle;
use crate::convert::tensor_to_value;
use crate::error::BuiltinError;
use crate::native::{self, PrintOptions};
use crate::value::{Arg, Value};

/// Where each printed object comes from when the callback runs.
#[derive(Debug, Clone)]
enum Slot {
    Native(Value),
    /// Index into the callback's materialized inputs.
    Staged(usize),
}

/// Stage a host callback that prints `objects` once their staged parts
/// have been materialized.
///
/// At execution time staged values are converted back to host values,
/// byte strings are decoded to text, and output is flushed unless `flush`
/// was given explicitly. Options left omitted take the host defaults. The
/// returned node carries a placeholder result so it can be fetched or used
/// as a control dependency.
pub fn print_staged(objects: &[Value], options: PrintOptions) -> Result<Value, BuiltinError> {
    let mut inputs: Vec<Symbolic> = Vec::new();
    let slots: Vec<Slot> = objects
        .iter()
        .map(|o| match staged_handle(o) {
            Some(handle) => {
                inputs.push(handle.clone());
                Slot::Staged(inputs.len() - 1)
            }
            None => Slot::Native(o.clone()),
        })
        .collect();
    let graph = inputs
        .first()
        .map(|s| s.graph().clone())
        .ok_or_else(|| BuiltinError::type_error("print() staged path expects a staged object"))?;

    let options = callback_options(options);

    let callback = HostCallback::new("print", move |materialized: &[Tensor]| {
        let values = slots
            .iter()
            .map(|slot| match slot {
                Slot::Native(v) => Ok(v.clone()),
                Slot::Staged(i) => materialized
                    .get(*i)
                    .map(|t| decode_text(tensor_to_value(t)))
                    .ok_or_else(|| format!("missing input {}", i)),
            })
            .collect::<Result<Vec<_>, String>>()?;
        native::print(&values, &options).map_err(|e| e.to_string())?;
        Ok(None)
    });

    debug!(inputs = inputs.len(), "stage print callback");
    let node = graph.host_callback(callback, &inputs, None, true)?;
    Ok(Value::Tensor(node))
}

/// Options the callback prints with: an omitted `flush` becomes true, any
/// explicit value is kept.
fn callback_options(mut options: PrintOptions) -> PrintOptions {
    if options.flush.is_omitted() {
        options.flush = Arg::Given(Value::Bool(true));
    }
    options
}

fn decode_text(value: Value) -> Value {
    match value {
        Value::Bytes(b) => Value::Str(String::from_utf8_lossy(&b).into_owned()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autostage_graph::{DType, Graph, Session, StaticShape};

    use crate::value::Stream;

    #[test]
    fn callback_defaults_to_flushing_and_decodes_text() {
        let g = Graph::new();
        let s = g.constant(Tensor::scalar_string("staged"));
        let out = Stream::buffer();
        let options = PrintOptions {
            file: Arg::Given(Value::Stream(out.clone())),
            ..PrintOptions::default()
        };
        let Value::Tensor(node) = print_staged(&[Value::str("a"), Value::Tensor(s)], options).unwrap() else {
            panic!("expected a staged node");
        };
        assert_eq!(node.dtype(), DType::I32);
        assert_eq!(out.contents().unwrap(), "");

        Session::run(&node, Default::default()).unwrap();
        assert_eq!(out.contents().unwrap(), "a staged\n");
    }

    #[test]
    fn explicit_flush_reaches_the_callback() {
        let options = PrintOptions {
            flush: Arg::Given(Value::Bool(false)),
            ..PrintOptions::default()
        };
        assert_eq!(callback_options(options.clone()).flush, Arg::Given(Value::Bool(false)));
        assert_eq!(
            callback_options(PrintOptions::default()).flush,
            Arg::Given(Value::Bool(true))
        );

        let g = Graph::new();
        let x = g.constant(Tensor::scalar_int(7, DType::I32));
        let out = Stream::buffer();
        let options = PrintOptions {
            file: Arg::Given(Value::Stream(out.clone())),
            ..options
        };
        let Value::Tensor(node) = print_staged(&[Value::Tensor(x)], options).unwrap() else {
            panic!("expected a staged node");
        };
        Session::run(&node, Default::default()).unwrap();
        assert_eq!(out.contents().unwrap(), "7\n");
    }

    #[test]
    fn requires_a_staged_object() {
        let err = print_staged(&[Value::Int(1)], PrintOptions::default()).unwrap_err();
        assert!(matches!(err, BuiltinError::Type(_)));
    }

    #[test]
    fn callback_errors_surface_at_execution() {
        let g = Graph::new();
        let x = g.placeholder("x", DType::I32, StaticShape::scalar());
        let options = PrintOptions {
            sep: Arg::Given(Value::Int(1)),
            file: Arg::Given(Value::Stream(Stream::buffer())),
            ..PrintOptions::default()
        };
        let Value::Tensor(node) = print_staged(&[Value::Tensor(x.clone()), Value::Int(2)], options).unwrap() else {
            panic!("expected a staged node");
        };
        let feeds = autostage_graph::Feeds::new().feed(&x, Tensor::scalar_int(1, DType::I32));
        let err = BuiltinError::from(Session::run(&node, feeds).unwrap_err());
        assert!(err.is_execution_time());
        assert!(err.to_string().contains("sep must be None or a string"));
    }
}
