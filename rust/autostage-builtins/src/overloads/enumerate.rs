use tracing::debug;

use crate::classify::{classify, ValueClass};
use crate::error::BuiltinError;
use crate::native;
use crate::registry::{Builtin, OverloadEntry};
use crate::value::{CallArgs, Value};

/// Deferred sequence sources pair elements with their index themselves;
/// everything else goes through the host `enumerate`.
pub fn enumerate_(s: &Value, start: &Value) -> Result<Value, BuiltinError> {
    match classify(s) {
        ValueClass::DeferredSequenceSource => source_enumerate(s, start),
        _ => native::enumerate(s, start),
    }
}

fn source_enumerate(s: &Value, start: &Value) -> Result<Value, BuiltinError> {
    let Value::Dataset(source) = s else {
        return Err(BuiltinError::type_error(format!(
            "enumerate() staged path expects a deferred sequence source, got '{}'",
            s.type_name()
        )));
    };
    let start = start.expect_index()?;
    debug!(cardinality = source.cardinality(), start, "source enumerate");
    Ok(Value::Dataset(source.enumerate(start)))
}

const PARAMS: [&str; 2] = ["iterable", "start"];

fn enumerate_native(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [s, start] = args.bind("enumerate", &PARAMS, 1)?;
    native::enumerate(&s.or(Value::None), &start.or(Value::Int(0)))
}

fn enumerate_staged(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [s, start] = args.bind("enumerate", &PARAMS, 1)?;
    source_enumerate(&s.or(Value::None), &start.or(Value::Int(0)))
}

fn enumerate_dispatch(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [s, start] = args.bind("enumerate", &PARAMS, 1)?;
    enumerate_(&s.or(Value::None), &start.or(Value::Int(0)))
}

pub(super) const ENUMERATE: OverloadEntry = OverloadEntry {
    name: "enumerate_",
    builtin: Builtin::Enumerate,
    native_impl: enumerate_native,
    staged_impl: enumerate_staged,
    dispatch: enumerate_dispatch,
};
