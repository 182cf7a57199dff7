use autostage_graph::{DType, Symbolic};
use tracing::debug;

use super::expect_symbolic;
use crate::classify::symbolic_array;
use crate::error::BuiltinError;
use crate::native;
use crate::registry::{Builtin, OverloadEntry};
use crate::value::{Arg, CallArgs, Value};

/// Width of staged `float()` results.
const STAGED_FLOAT: DType = DType::F32;
/// Width of staged `int()` results.
const STAGED_INT: DType = DType::I32;

pub fn abs_(x: &Value) -> Result<Value, BuiltinError> {
    match symbolic_array(x) {
        Some(s) => staged_abs(s),
        None => native::abs(x),
    }
}

fn staged_abs(x: &Symbolic) -> Result<Value, BuiltinError> {
    debug!(node = %x.id(), "staged abs");
    Ok(Value::Tensor(x.graph().abs(x)?))
}

pub fn float_(x: &Value) -> Result<Value, BuiltinError> {
    match symbolic_array(x) {
        Some(s) => staged_number(s, STAGED_FLOAT),
        None => native::float(x),
    }
}

/// `int(x)` or `int(x, base)`. Staged conversion only parses decimal text.
pub fn int_(x: &Value, base: &Arg) -> Result<Value, BuiltinError> {
    match symbolic_array(x) {
        Some(s) => staged_int(s, base),
        None => native::int(x, base),
    }
}

fn staged_int(x: &Symbolic, base: &Arg) -> Result<Value, BuiltinError> {
    match base.given() {
        None => {}
        Some(b) if *b == Value::Int(10) => {}
        Some(b) => {
            return Err(BuiltinError::Unsupported(format!(
                "base {} not supported for staged int conversion",
                b.repr()
            )))
        }
    }
    staged_number(x, STAGED_INT)
}

/// Text is parsed, everything else is cast.
fn staged_number(x: &Symbolic, dtype: DType) -> Result<Value, BuiltinError> {
    let graph = x.graph();
    let out = if x.dtype().is_string() {
        debug!(node = %x.id(), %dtype, "staged string_to_number");
        graph.string_to_number(x, dtype)?
    } else {
        debug!(node = %x.id(), %dtype, "staged cast");
        graph.cast(x, dtype)?
    };
    Ok(Value::Tensor(out))
}

// ── Registry adapters ───────────────────────────────────────────────────

fn abs_native(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [x] = args.bind("abs", &["x"], 1)?;
    native::abs(&x.or(Value::None))
}

fn abs_staged(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [x] = args.bind("abs", &["x"], 1)?;
    staged_abs(expect_symbolic("abs", &x.or(Value::None))?)
}

fn abs_dispatch(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [x] = args.bind("abs", &["x"], 1)?;
    abs_(&x.or(Value::None))
}

fn float_native(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [x] = args.bind("float", &["x"], 0)?;
    native::float(&x.or(Value::Int(0)))
}

fn float_staged(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [x] = args.bind("float", &["x"], 1)?;
    staged_number(expect_symbolic("float", &x.or(Value::None))?, STAGED_FLOAT)
}

fn float_dispatch(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [x] = args.bind("float", &["x"], 0)?;
    float_(&x.or(Value::Int(0)))
}

fn int_native(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [x, base] = args.bind("int", &["x", "base"], 0)?;
    native::int(&x.or(Value::Int(0)), &base)
}

fn int_staged(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [x, base] = args.bind("int", &["x", "base"], 1)?;
    staged_int(expect_symbolic("int", &x.or(Value::None))?, &base)
}

fn int_dispatch(args: &CallArgs) -> Result<Value, BuiltinError> {
    let [x, base] = args.bind("int", &["x", "base"], 0)?;
    int_(&x.or(Value::Int(0)), &base)
}

pub(super) const ABS: OverloadEntry = OverloadEntry {
    name: "abs_",
    builtin: Builtin::Abs,
    native_impl: abs_native,
    staged_impl: abs_staged,
    dispatch: abs_dispatch,
};

pub(super) const FLOAT: OverloadEntry = OverloadEntry {
    name: "float_",
    builtin: Builtin::Float,
    native_impl: float_native,
    staged_impl: float_staged,
    dispatch: float_dispatch,
};

pub(super) const INT: OverloadEntry = OverloadEntry {
    name: "int_",
    builtin: Builtin::Int,
    native_impl: int_native,
    staged_impl: int_staged,
    dispatch: int_dispatch,
};

#[cfg(test)]
mod tests {
    use super::*;
    use autostage_graph::{Graph, StaticShape};

    #[test]
    fn staged_float_of_text_parses() {
        let g = Graph::new();
        let s = g.placeholder("s", DType::String, StaticShape::scalar());
        let Value::Tensor(out) = float_(&Value::Tensor(s)).unwrap() else {
            panic!("expected a staged value");
        };
        assert_eq!(out.dtype(), DType::F32);
        assert!(g.to_string().contains("string_to_number"));
    }

    #[test]
    fn staged_int_rejects_other_bases() {
        let g = Graph::new();
        let s = g.placeholder("s", DType::String, StaticShape::scalar());
        let err = int_(&Value::Tensor(s.clone()), &Arg::Given(Value::Int(16))).unwrap_err();
        assert!(matches!(err, BuiltinError::Unsupported(_)));
        assert!(err.to_string().contains("base 16 not supported"));
        assert!(int_(&Value::Tensor(s), &Arg::Given(Value::Int(10))).is_ok());
    }

    #[test]
    fn staged_half_requires_a_symbolic_argument() {
        let err = (ABS.staged_impl)(&CallArgs::new(vec![Value::Int(1)])).unwrap_err();
        assert!(matches!(err, BuiltinError::Type(_)));
    }
}
