//! Overloads agree with the host builtins on host values.

use autostage_builtins::{
    abs_, enumerate_, float_, int_, lookup, Arg, Builtin, BuiltinError, CallArgs, Value,
};
use autostage_graph::{DType, Dataset, Graph, Session, StaticShape, Tensor, TensorData};

fn given(v: impl Into<Value>) -> Arg {
    Arg::Given(v.into())
}

fn args(values: Vec<Value>) -> CallArgs {
    CallArgs::new(values)
}

#[test]
fn native_parity_across_the_registry() {
    let cases: Vec<(Builtin, CallArgs)> = vec![
        (Builtin::Abs, args(vec![Value::Int(-5)])),
        (Builtin::Abs, args(vec![Value::Float(-0.5)])),
        (Builtin::Float, args(vec![Value::str(" 1.5 ")])),
        (Builtin::Float, args(vec![])),
        (Builtin::Int, args(vec![Value::Float(-2.7)])),
        (Builtin::Int, args(vec![Value::str("0x1f"), Value::Int(0)])),
        (Builtin::Len, args(vec![Value::Tuple(vec![Value::None; 3])])),
        (Builtin::Range, args(vec![Value::Int(2), Value::Int(8), Value::Int(2)])),
        (
            Builtin::Enumerate,
            args(vec![Value::str("ab")]).keyword("start", Value::Int(1)),
        ),
    ];
    for (builtin, call) in cases {
        let native = builtin.call_native(&call).unwrap();
        let overloaded = lookup(builtin).call(&call).unwrap();
        assert_eq!(native, overloaded, "{} disagrees on {:?}", builtin, call);
    }
}

#[test]
fn host_errors_are_preserved() {
    assert!(matches!(abs_(&Value::str("x")), Err(BuiltinError::Type(_))));
    assert!(matches!(float_(&Value::str("nope")), Err(BuiltinError::Value(_))));
    assert!(matches!(int_(&Value::str("12"), &given(1i64)), Err(BuiltinError::Value(_))));
    assert!(matches!(int_(&Value::Float(f64::NAN), &Arg::Omitted), Err(BuiltinError::Value(_))));
}

#[test]
fn staged_abs_and_conversions() {
    let g = Graph::new();
    let x = g.placeholder("x", DType::I32, StaticShape::scalar());
    let Value::Tensor(a) = abs_(&Value::Tensor(x.clone())).unwrap() else {
        panic!("expected staged abs");
    };
    assert_eq!(a.dtype(), DType::I32);

    let Value::Tensor(f) = float_(&Value::Tensor(x.clone())).unwrap() else {
        panic!("expected staged float");
    };
    assert_eq!(f.dtype(), DType::F32);

    let s = g.constant(Tensor::scalar_string("42"));
    let Value::Tensor(i) = int_(&Value::Tensor(s), &Arg::Omitted).unwrap() else {
        panic!("expected staged int");
    };
    assert_eq!(i.dtype(), DType::I32);
    assert!(g.to_string().contains("string_to_number"));
    assert_eq!(Session::run(&i, Default::default()).unwrap().to_i64(), Some(42));
}

#[test]
fn staged_int_rejects_other_bases() {
    let g = Graph::new();
    let s = g.constant(Tensor::scalar_string("ff"));
    let err = int_(&Value::Tensor(s), &given(16i64)).unwrap_err();
    assert!(matches!(err, BuiltinError::Unsupported(_)));
    assert!(err.to_string().contains("base 16"));
}

#[test]
fn enumerate_on_a_deferred_source_stays_deferred() {
    let source = Dataset::range(3);
    let Value::Dataset(pairs) = enumerate_(&Value::Dataset(source), &Value::Int(10)).unwrap() else {
        panic!("expected a deferred source");
    };
    let firsts: Vec<i64> = pairs.iter().map(|e| e[0].to_i64().unwrap()).collect();
    assert_eq!(firsts, vec![10, 11, 12]);
    assert_eq!(pairs.cardinality(), 3);
}

#[test]
fn enumerate_on_host_values_is_eager() {
    let out = enumerate_(&Value::List(vec![Value::str("a"), Value::str("b")]), &Value::Int(0)).unwrap();
    assert_eq!(out.to_string(), "[(0, 'a'), (1, 'b')]");
}

#[test]
fn staged_abs_runs() {
    let g = Graph::new();
    let x = g.constant(
        Tensor::from_floats(vec![-1.5, 2.0], autostage_graph::Shape::vector(2), DType::F32).unwrap(),
    );
    let Value::Tensor(a) = abs_(&Value::Tensor(x)).unwrap() else {
        panic!("expected staged abs");
    };
    match Session::run(&a, Default::default()).unwrap().data() {
        TensorData::Float(v) => assert_eq!(v, &vec![1.5, 2.0]),
        other => panic!("expected floats, got {:?}", other),
    }
}
