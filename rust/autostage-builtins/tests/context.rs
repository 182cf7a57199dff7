//! Evaluating source against ancestor frames.

use autostage_builtins::{eval_in_context, evaluate, execute, BuiltinError, CallStack, EvalArgs, Frame, Scope, Value};

fn frame(name: &str, globals: &Scope, locals: &[(&str, Value)]) -> Frame {
    Frame::new(name, globals.clone(), locals.iter().cloned().collect())
}

fn stack() -> CallStack {
    let globals: Scope = [("scale", Value::Int(100))].into_iter().collect();
    let mut stack = CallStack::new();
    stack.push(frame("main", &globals, &[("x", Value::Int(1))]));
    stack.push(frame("helper", &globals, &[("x", Value::Int(2)), ("name", Value::str("ab"))]));
    stack
}

#[test]
fn immediate_caller_scopes() {
    let out = eval_in_context(evaluate, EvalArgs::new("x + 1"), &stack(), 0).unwrap();
    assert_eq!(out, Value::Int(3));
    let out = eval_in_context(evaluate, EvalArgs::new("len(name) * scale"), &stack(), 0).unwrap();
    assert_eq!(out, Value::Int(200));
}

#[test]
fn deeper_delta_reaches_outer_frames() {
    let out = eval_in_context(evaluate, EvalArgs::new("x + 1"), &stack(), 1).unwrap();
    assert_eq!(out, Value::Int(2));
    let err = eval_in_context(evaluate, EvalArgs::new("name"), &stack(), 1).unwrap_err();
    assert!(matches!(err, BuiltinError::Name(_)));
}

#[test]
fn explicit_scopes_win() {
    let globals: Scope = [("x", Value::Int(40))].into_iter().collect();
    let args = EvalArgs::new("x + 2").with_globals(globals).with_locals(Scope::new());
    assert_eq!(eval_in_context(evaluate, args, &stack(), 0).unwrap(), Value::Int(42));
}

#[test]
fn statements_bind_into_the_callers_locals() {
    let stack = stack();
    eval_in_context(execute, EvalArgs::new("y = x * 10"), &stack, 0).unwrap();
    let helper = stack.ancestor(1).unwrap();
    assert_eq!(helper.locals().get("y"), Some(Value::Int(20)));
    assert!(!stack.ancestor(2).unwrap().locals().contains("y"));
}

#[test]
fn too_deep_is_a_frame_resolution_error() {
    let err = eval_in_context(evaluate, EvalArgs::new("x"), &stack(), 5).unwrap_err();
    assert!(matches!(err, BuiltinError::FrameResolution { requested: 6, depth: 2 }));
    assert!(CallStack::new().current().is_none());
}
