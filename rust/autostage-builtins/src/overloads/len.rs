use autostage_graph::{DType, Symbolic, Tensor};
use tracing::debug;

use crate::classify::{classify, ValueClass};
use crate::error::BuiltinError;
use crate::native;
use crate::registry::{Builtin, OverloadEntry};
use crate::value::{CallArgs, Value};

/// Length of a host or staged value.
///
/// Staged containers use their own size queries. Staged arrays are resolved
/// as cheaply as their static shape allows: a known leading dimension is
/// returned as a plain integer, a known rank yields a dynamic shape query,
/// and an unknown rank defers the rank check to execution time.
pub fn len_(s: &Value) -> Result<Value, BuiltinError> {
    match classify(s) {
        ValueClass::Native | ValueClass::DeferredSequenceSource => native::len(s),
        _ => staged_len(s),
    }
}

fn staged_len(s: &Value) -> Result<Value, BuiltinError> {
    match (classify(s), s) {
        (ValueClass::SymbolicArrayBuffer, Value::TensorArray(buffer)) => {
            debug!(node = %buffer.handle().id(), "len of array buffer");
            Ok(Value::Tensor(buffer.size()))
        }
        (ValueClass::SymbolicList, Value::Tensor(list)) => {
            debug!(node = %list.id(), "len of list");
            Ok(Value::Tensor(list.graph().list_length(list)?))
        }
        (ValueClass::SymbolicArray, Value::Tensor(x)) => array_len(x),
        (class, _) => Err(BuiltinError::type_error(format!(
            "len() staged path expects a staged value, got a {} value",
            class
        ))),
    }
}

fn array_len(x: &Symbolic) -> Result<Value, BuiltinError> {
    let graph = x.graph();
    let static_shape = x.shape();

    if let Some(leading) = static_shape.dim(0) {
        debug!(node = %x.id(), leading, "len folded from static shape");
        return Ok(Value::Int(leading as i64));
    }

    if static_shape.rank().is_some() {
        let shape = graph.shape(x)?;
        if shape.shape().dim(0) == Some(0) {
            return Err(BuiltinError::Validation(format!(
                "len requires a non-scalar value, got one of shape {}",
                static_shape
            )));
        }
        let leading = graph.index(&shape, 0)?;
        if let Some(n) = graph.constant_value(&leading).and_then(|t| t.to_i64()) {
            return Ok(Value::Int(n));
        }
        debug!(node = %x.id(), "len from dynamic shape");
        return Ok(Value::Tensor(leading));
    }

    debug!(node = %x.id(), "len with runtime rank check");
    let rank = graph.rank(x)?;
    let zero = graph.constant(Tensor::scalar_int(0, DType::I32));
    let has_rank = graph.greater(&rank, &zero)?;
    let leading = graph.index(&graph.shape(x)?, 0)?;

    let prefix = graph.constant(Tensor::scalar_string("len requires non-zero rank, got "));
    let message = graph.string_join(&[prefix, graph.as_string(&rank)?], "")?;
    let never = graph.constant(Tensor::scalar_bool(false));
    let failed = graph.assert(&never, &[message])?;
    let rejected = graph.with_dependencies(&[failed], &zero)?;

    Ok(Value::Tensor(graph.cond(&has_rank, &leading, &rejected)?))
}

fn len_native(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [obj] = args.bind("len", &["obj"], 1)?;
    native::len(&obj.or(Value::None))
}

fn len_staged(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [obj] = args.bind("len", &["obj"], 1)?;
    staged_len(&obj.or(Value::None))
}

fn len_dispatch(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [obj] = args.bind("len", &["obj"], 1)?;
    len_(&obj.or(Value::None))
}

pub(super) const LEN: OverloadEntry = OverloadEntry {
    name: "len_",
    builtin: Builtin::Len,
    native_impl: len_native,
    staged_impl: len_staged,
    dispatch: len_dispatch,
};
