//! `range_` on host bounds and on staged bounds.

use autostage_builtins::{range_, Arg, BuiltinError, RangeValue, Value};
use autostage_graph::{DType, Feeds, Graph, Session, Symbolic, StaticShape, Tensor, TensorData};

fn given(v: impl Into<Value>) -> Arg {
    Arg::Given(v.into())
}

fn staged_int(g: &Graph, n: i64) -> Value {
    Value::Tensor(g.constant(Tensor::scalar_int(n, DType::I32)))
}

fn run_ints(value: &Value, feeds: Feeds) -> Vec<i64> {
    let Value::Tensor(sym) = value else {
        panic!("expected a staged range, got {:?}", value);
    };
    match Session::run(sym, feeds).unwrap().data() {
        TensorData::Int(v) => v.clone(),
        other => panic!("expected ints, got {:?}", other),
    }
}

fn run_floats(value: &Value) -> Vec<f64> {
    let Value::Tensor(sym) = value else {
        panic!("expected a staged range, got {:?}", value);
    };
    match Session::run(sym, Feeds::new()).unwrap().data() {
        TensorData::Float(v) => v.clone(),
        other => panic!("expected floats, got {:?}", other),
    }
}

#[test]
fn host_bounds_build_a_host_range() {
    let r = range_(&Value::Int(5), &Arg::Omitted, &Arg::Omitted).unwrap();
    assert_eq!(r, Value::Range(RangeValue::new(0, 5, 1).unwrap()));
    let r = range_(&Value::Int(1), &given(10i64), &given(3i64)).unwrap();
    assert_eq!(r.to_string(), "range(1, 10, 3)");
    assert!(matches!(
        range_(&Value::Int(1), &given(2i64), &given(0i64)),
        Err(BuiltinError::Value(_))
    ));
}

#[test]
fn equal_staged_bounds_are_empty() {
    let g = Graph::new();
    let r = range_(&staged_int(&g, 2), &given(2i64), &Arg::Omitted).unwrap();
    assert!(run_ints(&r, Feeds::new()).is_empty());
}

#[test]
fn stop_below_start_is_clamped_without_step() {
    let g = Graph::new();
    let r = range_(&staged_int(&g, 5), &given(2i64), &Arg::Omitted).unwrap();
    assert!(run_ints(&r, Feeds::new()).is_empty());
}

#[test]
fn negative_limit_is_clamped() {
    let g = Graph::new();
    let r = range_(&staged_int(&g, -3), &Arg::Omitted, &Arg::Omitted).unwrap();
    assert!(run_ints(&r, Feeds::new()).is_empty());
    let r = range_(&staged_int(&g, 4), &Arg::Omitted, &Arg::Omitted).unwrap();
    assert_eq!(run_ints(&r, Feeds::new()), vec![0, 1, 2, 3]);
}

#[test]
fn explicit_step_passes_bounds_through() {
    let g = Graph::new();
    let r = range_(&staged_int(&g, 5), &given(2i64), &given(-1i64)).unwrap();
    assert_eq!(run_ints(&r, Feeds::new()), vec![5, 4, 3]);

    let err = range_(&staged_int(&g, 5), &given(2i64), &given(1i64)).unwrap_err();
    assert!(matches!(err, BuiltinError::Graph(_)));
}

#[test]
fn staged_stop_with_host_start() {
    let g = Graph::new();
    let n: Symbolic = g.placeholder("n", DType::I32, StaticShape::scalar());
    let r = range_(&Value::Int(1), &given(n.clone()), &Arg::Omitted).unwrap();
    let feeds = Feeds::new().feed(&n, Tensor::scalar_int(4, DType::I32));
    assert_eq!(run_ints(&r, feeds), vec![1, 2, 3]);
    let feeds = Feeds::new().feed(&n, Tensor::scalar_int(0, DType::I32));
    assert!(run_ints(&r, feeds).is_empty());
}

#[test]
fn host_bound_outside_i32_is_rejected() {
    let g = Graph::new();
    let err = range_(&staged_int(&g, 0), &given(4_294_967_299i64), &Arg::Omitted).unwrap_err();
    assert!(matches!(err, BuiltinError::Value(_)), "unexpected error: {}", err);
    assert!(err.to_string().contains("4294967299 is out of bounds for i32"));
}

#[test]
fn int64_bounds_stay_exact() {
    let g = Graph::new();
    let start = Value::Tensor(g.constant(Tensor::scalar_int((1 << 53) - 2, DType::I64)));
    let r = range_(&start, &given((1i64 << 53) + 1), &Arg::Omitted).unwrap();
    assert_eq!(
        run_ints(&r, Feeds::new()),
        vec![(1 << 53) - 2, (1 << 53) - 1, 1 << 53]
    );
}

#[test]
fn host_float_step_makes_a_float_range() {
    let g = Graph::new();
    let r = range_(&staged_int(&g, 0), &given(5i64), &given(2.5)).unwrap();
    let Value::Tensor(sym) = &r else {
        panic!("expected a staged range");
    };
    assert_eq!(sym.dtype(), DType::F32);
    assert_eq!(run_floats(&r), vec![0.0, 2.5]);
}

#[test]
fn host_float_stop_is_not_truncated() {
    let g = Graph::new();
    let r = range_(&staged_int(&g, 0), &given(2.7), &Arg::Omitted).unwrap();
    assert_eq!(run_floats(&r), vec![0.0, 1.0, 2.0]);

    let r = range_(&Value::Float(0.5), &given(staged_int(&g, 3)), &Arg::Omitted).unwrap();
    assert_eq!(run_floats(&r), vec![0.5, 1.5, 2.5]);
}
