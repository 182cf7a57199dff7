//! `print_` keyword validation and both execution paths.

use autostage_builtins::{print_, BuiltinError, Stream, Value};
use autostage_graph::{DType, Feeds, Graph, Session, StaticShape, Tensor};

fn to(out: &Stream) -> (String, Value) {
    ("file".to_string(), Value::Stream(out.clone()))
}

fn kw(name: &str, value: Value) -> (String, Value) {
    (name.to_string(), value)
}

#[test]
fn host_objects_print_immediately() {
    let out = Stream::buffer();
    let result = print_(
        &[Value::Int(1), Value::Int(2)],
        &[kw("sep", Value::str("-")), to(&out)],
    )
    .unwrap();
    assert_eq!(result, Value::None);
    assert_eq!(out.contents().unwrap(), "1-2\n");
}

#[test]
fn host_rendering_of_nested_values() {
    let out = Stream::buffer();
    let items = Value::List(vec![Value::str("a"), Value::Float(1.0), Value::None]);
    print_(&[items, Value::Bool(true)], &[kw("end", Value::str("!")), to(&out)]).unwrap();
    assert_eq!(out.contents().unwrap(), "['a', 1.0, None] True!");
}

#[test]
fn unknown_keywords_are_rejected_first() {
    let out = Stream::buffer();
    let err = print_(
        &[Value::Int(1)],
        &[kw("zeta", Value::Bool(true)), kw("bogus", Value::Bool(true)), to(&out)],
    )
    .unwrap_err();
    assert!(matches!(err, BuiltinError::Validation(_)));
    assert_eq!(err.to_string(), "invalid keyword arguments: bogus, zeta");
    assert_eq!(out.contents().unwrap(), "");
}

#[test]
fn unknown_keywords_are_rejected_on_the_staged_path_too() {
    let g = Graph::new();
    let x = g.constant(Tensor::scalar_int(1, DType::I32));
    let nodes = g.len();
    let err = print_(&[Value::Tensor(x)], &[kw("bogus", Value::None)]).unwrap_err();
    assert!(err.to_string().contains("bogus"));
    assert_eq!(g.len(), nodes);
}

#[test]
fn staged_objects_print_when_the_graph_runs() {
    let g = Graph::new();
    let x = g.placeholder("x", DType::I32, StaticShape::known(vec![Some(3)]));
    let out = Stream::buffer();
    let result = print_(
        &[Value::str("x ="), Value::Tensor(x.clone())],
        &[kw("sep", Value::str(" ")), to(&out)],
    )
    .unwrap();
    let Value::Tensor(node) = result else {
        panic!("expected a staged print node");
    };
    assert_eq!(out.contents().unwrap(), "");

    let value = Tensor::from_ints(vec![1, 2, 3], autostage_graph::Shape::vector(3), DType::I32).unwrap();
    Session::run(&node, Feeds::new().feed(&x, value)).unwrap();
    assert_eq!(out.contents().unwrap(), "x = [1, 2, 3]\n");
}

#[test]
fn staged_strings_are_decoded() {
    let g = Graph::new();
    let s = g.constant(Tensor::scalar_string("bytes"));
    let out = Stream::buffer();
    let Value::Tensor(node) = print_(&[Value::Tensor(s)], &[to(&out)]).unwrap() else {
        panic!("expected a staged print node");
    };
    Session::run(&node, Feeds::new()).unwrap();
    assert_eq!(out.contents().unwrap(), "bytes\n");
}
