//! Overload lookup and the registry contents.

use autostage_builtins::{
    lookup, overload_of, overload_of_value, registry, Builtin, CallArgs, Callable, HostFunction,
    Value,
};
use strum::{EnumCount, IntoEnumIterator};

fn call(target: &Callable, args: Vec<Value>) -> Value {
    target.call(&CallArgs::new(args)).unwrap()
}

#[test]
fn every_builtin_has_an_overload() {
    assert_eq!(registry().count(), Builtin::COUNT);
    for builtin in Builtin::iter() {
        let entry = lookup(builtin);
        assert_eq!(entry.builtin, builtin);
        assert_eq!(entry.name, format!("{}_", builtin.name()));
    }
}

#[test]
fn builtins_map_to_their_overloads() {
    let target = overload_of(Callable::Builtin(Builtin::Len));
    assert_eq!(target, Callable::Overload(lookup(Builtin::Len)));
    assert_eq!(target.to_string(), "<overload len_>");
    assert_eq!(call(&target, vec![Value::str("abc")]), Value::Int(3));
}

#[test]
fn xrange_resolves_to_range() {
    assert_eq!(Builtin::from_name("xrange"), Some(Builtin::Range));
    assert_eq!(Builtin::from_name("range"), Some(Builtin::Range));
    assert_eq!(Builtin::from_name("zip"), None);
}

#[test]
fn other_callables_pass_through() {
    let f = Callable::Function(HostFunction::new("twice", |args: &CallArgs| {
        let n = args.positional[0].expect_index()?;
        Ok(Value::Int(n * 2))
    }));
    let resolved = overload_of(f.clone());
    assert_eq!(resolved, f);
    assert_eq!(call(&resolved, vec![Value::Int(4)]), Value::Int(8));
}

#[test]
fn non_callable_values_pass_through() {
    assert_eq!(overload_of_value(Value::Int(7)), Value::Int(7));
    let resolved = overload_of_value(Value::Callable(Callable::Builtin(Builtin::Abs)));
    assert_eq!(resolved.to_string(), "<overload abs_>");
}

#[test]
fn arity_errors_match_the_host() {
    let target = overload_of(Callable::Builtin(Builtin::Abs));
    let err = target.call(&CallArgs::new(vec![])).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: abs() missing required argument 'x'");
    let err = target
        .call(&CallArgs::new(vec![Value::Int(1), Value::Int(2)]))
        .unwrap_err();
    assert_eq!(err.to_string(), "TypeError: abs() takes at most 1 arguments (2 given)");
}
