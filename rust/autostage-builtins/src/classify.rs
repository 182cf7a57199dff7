//! Value classification.
//!
//! Classification runs an ordered predicate chain and the first match wins.
//! Array buffers and lists are themselves symbolic, so their predicates must
//! be tried before the generic symbolic-array predicate.

use std::fmt;

use autostage_graph::{DType, Symbolic};
use tracing::trace;

use crate::value::Value;

/// Category of a runtime value, as seen by the overloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueClass {
    Native,
    SymbolicArrayBuffer,
    SymbolicList,
    SymbolicArray,
    DeferredSequenceSource,
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueClass::Native => "native",
            ValueClass::SymbolicArrayBuffer => "symbolic array buffer",
            ValueClass::SymbolicList => "symbolic list",
            ValueClass::SymbolicArray => "symbolic array",
            ValueClass::DeferredSequenceSource => "deferred sequence source",
        };
        write!(f, "{}", name)
    }
}

pub fn is_array_buffer(value: &Value) -> bool {
    matches!(value, Value::TensorArray(_))
}

pub fn is_list(value: &Value) -> bool {
    matches!(value, Value::Tensor(s) if s.dtype() == DType::Variant)
}

/// Any staged value, containers included.
pub fn is_symbolic(value: &Value) -> bool {
    matches!(value, Value::Tensor(_) | Value::TensorArray(_))
}

pub fn is_deferred_sequence_source(value: &Value) -> bool {
    matches!(value, Value::Dataset(_))
}

/// The predicate chain, most specific first.
pub const CLASSIFICATION_ORDER: [(fn(&Value) -> bool, ValueClass); 4] = [
    (is_array_buffer, ValueClass::SymbolicArrayBuffer),
    (is_list, ValueClass::SymbolicList),
    (is_symbolic, ValueClass::SymbolicArray),
    (is_deferred_sequence_source, ValueClass::DeferredSequenceSource),
];

pub fn classify(value: &Value) -> ValueClass {
    let class = CLASSIFICATION_ORDER
        .iter()
        .find(|(pred, _)| pred(value))
        .map_or(ValueClass::Native, |(_, class)| *class);
    trace!(kind = value.type_name(), %class, "classify");
    class
}

/// True when `value` should take a staged path.
pub fn is_staged(value: &Value) -> bool {
    matches!(
        classify(value),
        ValueClass::SymbolicArrayBuffer | ValueClass::SymbolicList | ValueClass::SymbolicArray
    )
}

/// The staged handle of a generic symbolic array.
pub(crate) fn symbolic_array(value: &Value) -> Option<&Symbolic> {
    match value {
        Value::Tensor(s) => Some(s),
        _ => None,
    }
}

/// The graph handle of any staged value; array buffers yield their buffer
/// handle.
pub(crate) fn staged_handle(value: &Value) -> Option<&Symbolic> {
    match value {
        Value::Tensor(s) => Some(s),
        Value::TensorArray(a) => Some(a.handle()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autostage_graph::{Dataset, Graph, StaticShape, Tensor};

    #[test]
    fn classification_is_ordered() {
        let g = Graph::new();
        let x = g.placeholder("x", DType::F32, StaticShape::unknown());
        let list = g.list_from_tensors(&[x.clone()], DType::F32).unwrap();
        let size = g.constant(Tensor::scalar_int(2, DType::I32));
        let buffer = g.tensor_array(DType::F32, &size).unwrap();

        assert_eq!(classify(&Value::TensorArray(buffer)), ValueClass::SymbolicArrayBuffer);
        assert_eq!(classify(&Value::Tensor(list)), ValueClass::SymbolicList);
        assert_eq!(classify(&Value::Tensor(x)), ValueClass::SymbolicArray);
        assert_eq!(
            classify(&Value::Dataset(Dataset::range(3))),
            ValueClass::DeferredSequenceSource
        );
        assert_eq!(classify(&Value::List(vec![])), ValueClass::Native);
        assert_eq!(classify(&Value::Int(1)), ValueClass::Native);
    }

    #[test]
    fn generic_predicate_also_matches_containers() {
        let g = Graph::new();
        let size = g.constant(Tensor::scalar_int(1, DType::I32));
        let buffer = Value::TensorArray(g.tensor_array(DType::I32, &size).unwrap());
        assert!(is_symbolic(&buffer));
        assert!(is_staged(&buffer));
        assert!(!is_staged(&Value::Dataset(Dataset::range(1))));
    }
}
