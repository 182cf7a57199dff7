//! Conversions between host values and tensors.

use autostage_graph::{DType, Graph, Shape, Symbolic, Tensor, TensorData};

use crate::error::BuiltinError;
use crate::value::{format_float, Value};

/// Build a concrete tensor from a host scalar or a rectangular nested list.
///
/// Numeric leaves follow `hint` when it is numeric; otherwise ints become
/// `i32` and floats `f32`, the staged defaults.
pub fn native_to_tensor(value: &Value, hint: Option<DType>) -> Result<Tensor, BuiltinError> {
    let mut dims = Vec::new();
    let mut leaves = Vec::new();
    flatten(value, 0, &mut dims, &mut leaves)?;
    let shape = Shape::new(dims);
    let dtype = leaf_dtype(&leaves, hint)?;
    let tensor = match dtype {
        DType::Bool => Tensor::from_bools(
            leaves.iter().map(|v| v.is_truthy()).collect(),
            shape,
        ),
        DType::String => Tensor::from_strings(
            leaves
                .iter()
                .map(|v| match v {
                    Value::Bytes(b) => b.clone(),
                    other => other.to_string().into_bytes(),
                })
                .collect(),
            shape,
        ),
        d if d.is_float() => Tensor::from_floats(
            leaves.iter().map(|v| leaf_f64(v)).collect(),
            shape,
            d,
        ),
        d => Tensor::from_ints(
            leaves
                .iter()
                .map(|v| leaf_int(v, d))
                .collect::<Result<_, _>>()?,
            shape,
            d,
        ),
    };
    tensor.map_err(|e| BuiltinError::value_error(e.to_string()))
}

fn flatten<'a>(
    value: &'a Value,
    depth: usize,
    dims: &mut Vec<usize>,
    leaves: &mut Vec<&'a Value>,
) -> Result<(), BuiltinError> {
    match value {
        Value::List(items) | Value::Tuple(items) => {
            if dims.len() == depth {
                dims.push(items.len());
            } else if dims.get(depth) != Some(&items.len()) {
                return Err(BuiltinError::value_error(
                    "cannot convert a ragged nested sequence to a tensor",
                ));
            }
            for item in items {
                flatten(item, depth + 1, dims, leaves)?;
            }
            Ok(())
        }
        Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) | Value::Bytes(_) => {
            if dims.len() != depth {
                return Err(BuiltinError::value_error(
                    "cannot convert a ragged nested sequence to a tensor",
                ));
            }
            leaves.push(value);
            Ok(())
        }
        other => Err(BuiltinError::type_error(format!(
            "cannot convert '{}' to a tensor",
            other.type_name()
        ))),
    }
}

fn leaf_dtype(leaves: &[&Value], hint: Option<DType>) -> Result<DType, BuiltinError> {
    let all = |pred: fn(&Value) -> bool| leaves.iter().all(|v| pred(v));
    if leaves.is_empty() {
        return Ok(hint.filter(|d| *d != DType::Variant).unwrap_or(DType::F32));
    }
    if all(|v| matches!(v, Value::Str(_) | Value::Bytes(_))) {
        return Ok(DType::String);
    }
    if all(|v| matches!(v, Value::Bool(_))) {
        return Ok(DType::Bool);
    }
    if !all(|v| matches!(v, Value::Bool(_) | Value::Int(_) | Value::Float(_))) {
        return Err(BuiltinError::type_error(
            "cannot convert a sequence of mixed element types to a tensor",
        ));
    }
    Ok(match hint {
        Some(d) if d.is_numeric() => d,
        _ if leaves.iter().any(|v| matches!(v, Value::Float(_))) => DType::F32,
        _ if leaves.iter().any(|v| !fits_i32(v)) => DType::I64,
        _ => DType::I32,
    })
}

fn leaf_f64(v: &Value) -> f64 {
    match v {
        Value::Float(f) => *f,
        other => other.as_index().unwrap_or(0) as f64,
    }
}

fn fits_i32(v: &Value) -> bool {
    v.as_index().map_or(true, |n| i32::try_from(n).is_ok())
}

/// An integer leaf, exactly. Floats must be integral and every value must
/// fit `dtype`.
fn leaf_int(v: &Value, dtype: DType) -> Result<i64, BuiltinError> {
    let n = match v {
        Value::Float(x) if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => *x as i64,
        Value::Float(x) => {
            return Err(BuiltinError::type_error(format!(
                "cannot convert {} to a {} tensor",
                format_float(*x),
                dtype
            )))
        }
        other => other.as_index().unwrap_or(0),
    };
    if dtype == DType::I32 && !fits_i32(&Value::Int(n)) {
        return Err(BuiltinError::value_error(format!(
            "{} is out of bounds for {}",
            n, dtype
        )));
    }
    Ok(n)
}

/// The staged handle for `value`: symbolic values pass through, host values
/// become constants in `graph`.
pub fn to_symbolic(value: &Value, graph: &Graph, hint: Option<DType>) -> Result<Symbolic, BuiltinError> {
    match value {
        Value::Tensor(s) => Ok(s.clone()),
        Value::TensorArray(a) => Ok(a.handle().clone()),
        other => Ok(graph.constant(native_to_tensor(other, hint)?)),
    }
}

/// The host value of a materialized tensor: scalars become host scalars,
/// strings become bytes, and higher ranks become nested lists.
pub fn tensor_to_value(t: &Tensor) -> Value {
    if let Some(items) = t.as_list() {
        return Value::List(items.iter().map(tensor_to_value).collect());
    }
    if !t.shape().is_scalar() {
        return match t.unstack() {
            Ok(rows) => Value::List(rows.iter().map(tensor_to_value).collect()),
            Err(_) => Value::List(Vec::new()),
        };
    }
    match t.data() {
        TensorData::Float(v) => Value::Float(v[0]),
        TensorData::Int(v) => Value::Int(v[0]),
        TensorData::Bool(v) => Value::Bool(v[0]),
        TensorData::Bytes(v) => Value::Bytes(v[0].clone()),
        TensorData::List(items) => Value::List(items.iter().map(tensor_to_value).collect()),
    }
}
