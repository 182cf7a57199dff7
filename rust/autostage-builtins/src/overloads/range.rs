use autostage_graph::{DType, Graph, Symbolic};
use tracing::debug;

use crate::classify::{is_staged, staged_handle};
use crate::convert::to_symbolic;
use crate::error::BuiltinError;
use crate::native;
use crate::registry::{Builtin, OverloadEntry};
use crate::value::{Arg, CallArgs, Value};

/// `range(stop)`, `range(start, stop)` or `range(start, stop, step)`.
///
/// The staged form clamps `stop` when no step is given so that an empty
/// range stays empty instead of failing graph construction. With an
/// explicit step the sign is unknown and the bounds are passed through.
/// Mixed bounds share one dtype: a host float makes the range a float range.
pub fn range_(start_or_stop: &Value, stop: &Arg, step: &Arg) -> Result<Value, BuiltinError> {
    let staged = is_staged(start_or_stop)
        || stop.given().is_some_and(is_staged)
        || step.given().is_some_and(is_staged);
    if staged {
        staged_range(start_or_stop, stop, step)
    } else {
        native::range(start_or_stop, stop, step)
    }
}

fn staged_range(start_or_stop: &Value, stop: &Arg, step: &Arg) -> Result<Value, BuiltinError> {
    let bounds: Vec<&Value> = [Some(start_or_stop), stop.given(), step.given()]
        .into_iter()
        .flatten()
        .collect();
    let anchor = bounds
        .iter()
        .find_map(|v| staged_handle(*v))
        .ok_or_else(|| BuiltinError::type_error("range() staged path expects a staged bound"))?;
    let graph = anchor.graph().clone();
    let dtype = bounds_dtype(&bounds)?;
    let operand = |v: &Value| -> Result<Symbolic, BuiltinError> {
        Ok(graph.cast(&to_symbolic(v, &graph, Some(dtype))?, dtype)?)
    };

    let out = match (stop.given(), step.given()) {
        (Some(stop), Some(step)) => {
            debug!(%dtype, "staged range with explicit step");
            graph.range(&operand(start_or_stop)?, &operand(stop)?, &operand(step)?)?
        }
        (Some(stop), None) => {
            debug!(%dtype, "staged range, clamped stop");
            let start = operand(start_or_stop)?;
            let stop = graph.maximum(&start, &operand(stop)?)?;
            graph.range(&start, &stop, &scalar(&graph, 1, dtype)?)?
        }
        (None, None) => {
            debug!(%dtype, "staged range, clamped limit");
            let zero = scalar(&graph, 0, dtype)?;
            let limit = graph.maximum(&operand(start_or_stop)?, &zero)?;
            graph.range(&zero, &limit, &scalar(&graph, 1, dtype)?)?
        }
        (None, Some(_)) => return Err(BuiltinError::type_error("range() step given without stop")),
    };
    Ok(Value::Tensor(out))
}

/// The common dtype of the bounds: the widest staged dtype, promoted to a
/// float when any host bound is a float.
fn bounds_dtype(bounds: &[&Value]) -> Result<DType, BuiltinError> {
    const ORDER: [DType; 4] = [DType::I32, DType::I64, DType::F32, DType::F64];
    let mut rank = 0;
    for v in bounds {
        let dtype = match (staged_handle(*v), v) {
            (Some(s), _) => s.dtype(),
            (None, Value::Float(_)) => DType::F32,
            _ => continue,
        };
        let r = ORDER.iter().position(|d| *d == dtype).ok_or_else(|| {
            BuiltinError::type_error(format!("range() bounds must be numeric, got {}", dtype))
        })?;
        rank = rank.max(r);
    }
    Ok(ORDER[rank])
}

fn scalar(graph: &Graph, n: i64, dtype: DType) -> Result<Symbolic, BuiltinError> {
    to_symbolic(&Value::Int(n), graph, Some(dtype))
}

const PARAMS: [&str; 3] = ["start_or_stop", "stop", "step"];

fn range_native(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [first, stop, step] = args.bind("range", &PARAMS, 1)?;
    native::range(&first.or(Value::None), &stop, &step)
}

fn range_staged(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [first, stop, step] = args.bind("range", &PARAMS, 1)?;
    staged_range(&first.or(Value::None), &stop, &step)
}

fn range_dispatch(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [first, stop, step] = args.bind("range", &PARAMS, 1)?;
    range_(&first.or(Value::None), &stop, &step)
}

pub(super) const RANGE: OverloadEntry = OverloadEntry {
    name: "range_",
    builtin: Builtin::Range,
    native_impl: range_native,
    staged_impl: range_staged,
    dispatch: range_dispatch,
};
