//! `len_` across host values, deferred sources and every staged shape case.

use autostage_builtins::{len_, BuiltinError, Value};
use autostage_graph::{DType, Dataset, Feeds, Graph, Session, Shape, StaticShape, Tensor};

fn floats(dims: Vec<usize>) -> Tensor {
    let n = dims.iter().product();
    Tensor::from_floats(vec![0.0; n], Shape::new(dims), DType::F32).unwrap()
}

fn run_int(value: &Value, feeds: Feeds) -> i64 {
    let Value::Tensor(sym) = value else {
        panic!("expected a staged result, got {:?}", value);
    };
    Session::run(sym, feeds).unwrap().to_i64().unwrap()
}

#[test]
fn host_values_use_host_len() {
    assert_eq!(len_(&Value::str("héllo")).unwrap(), Value::Int(5));
    assert_eq!(
        len_(&Value::List(vec![Value::Int(1), Value::None])).unwrap(),
        Value::Int(2)
    );
    let err = len_(&Value::Int(3)).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: object of type 'int' has no len()");
}

#[test]
fn deferred_source_reports_cardinality() {
    assert_eq!(len_(&Value::Dataset(Dataset::range(4))).unwrap(), Value::Int(4));
}

#[test]
fn static_leading_dimension_folds() {
    let g = Graph::new();
    let x = g.placeholder("x", DType::F32, StaticShape::known(vec![Some(3), Some(4)]));
    let nodes = g.len();
    assert_eq!(len_(&Value::Tensor(x)).unwrap(), Value::Int(3));
    assert_eq!(g.len(), nodes);
}

#[test]
fn dynamic_leading_dimension_is_read_at_run_time() {
    let g = Graph::new();
    let x = g.placeholder("x", DType::F32, StaticShape::known(vec![None, Some(4)]));
    let n = len_(&Value::Tensor(x.clone())).unwrap();
    assert_eq!(run_int(&n, Feeds::new().feed(&x, floats(vec![2, 4]))), 2);
    assert_eq!(run_int(&n, Feeds::new().feed(&x, floats(vec![7, 4]))), 7);
}

#[test]
fn known_scalar_fails_at_construction() {
    let g = Graph::new();
    let x = g.placeholder("x", DType::I32, StaticShape::scalar());
    let err = len_(&Value::Tensor(x)).unwrap_err();
    assert!(matches!(err, BuiltinError::Validation(_)));
    assert!(err.to_string().contains("len requires a non-scalar value"));
}

#[test]
fn unknown_rank_checks_at_run_time() {
    let g = Graph::new();
    let x = g.placeholder("x", DType::F32, StaticShape::unknown());
    let n = len_(&Value::Tensor(x.clone())).unwrap();

    assert_eq!(run_int(&n, Feeds::new().feed(&x, floats(vec![5]))), 5);

    let Value::Tensor(sym) = &n else {
        panic!("expected a staged result");
    };
    let feeds = Feeds::new().feed(&x, Tensor::scalar_float(1.0, DType::F32));
    let err = BuiltinError::from(Session::run(sym, feeds).unwrap_err());
    assert!(err.is_execution_time());
    assert!(
        err.to_string().contains("len requires non-zero rank, got 0"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn staged_list_uses_list_length() {
    let g = Graph::new();
    let a = g.constant(Tensor::scalar_int(1, DType::I32));
    let b = g.constant(Tensor::scalar_int(2, DType::I32));
    let list = g.list_from_tensors(&[a, b], DType::I32).unwrap();
    let n = len_(&Value::Tensor(list)).unwrap();
    assert_eq!(run_int(&n, Feeds::new()), 2);
    assert!(g.to_string().contains("list_length"));
}

#[test]
fn array_buffer_uses_its_size() {
    let g = Graph::new();
    let size = g.constant(Tensor::scalar_int(3, DType::I32));
    let buffer = g.tensor_array(DType::F32, &size).unwrap();
    let n = len_(&Value::TensorArray(buffer)).unwrap();
    assert_eq!(run_int(&n, Feeds::new()), 3);
}
