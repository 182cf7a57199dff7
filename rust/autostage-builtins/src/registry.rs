//! Builtin identities and the dispatch registry.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;
use strum::IntoEnumIterator;
use strum_macros::{EnumCount, EnumIter};
use tracing::debug;

use crate::error::BuiltinError;
use crate::overloads;
use crate::value::{CallArgs, Value};

/// The host builtins the overlay knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount)]
pub enum Builtin {
    Abs,
    Float,
    Int,
    Len,
    Print,
    Range,
    Enumerate,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Abs => "abs",
            Builtin::Float => "float",
            Builtin::Int => "int",
            Builtin::Len => "len",
            Builtin::Print => "print",
            Builtin::Range => "range",
            Builtin::Enumerate => "enumerate",
        }
    }

    /// Resolve a host builtin by name; `xrange` is an alias of `range`.
    pub fn from_name(name: &str) -> Option<Builtin> {
        if name == "xrange" {
            return Some(Builtin::Range);
        }
        Builtin::iter().find(|b| b.name() == name)
    }

    /// Invoke the plain host builtin, with no staging.
    pub fn call_native(self, args: &CallArgs) -> Result<Value, BuiltinError> {
        (lookup(self).native_impl)(args)
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Uniform entry point of an overload half.
pub type BuiltinFn = fn(&CallArgs) -> Result<Value, BuiltinError>;

/// The overload pair registered for one builtin.
pub struct OverloadEntry {
    pub name: &'static str,
    pub builtin: Builtin,
    /// Host semantics.
    pub native_impl: BuiltinFn,
    /// Staged semantics; callers must already know an argument is staged.
    pub staged_impl: BuiltinFn,
    /// Classifies the arguments and picks one of the two.
    pub dispatch: BuiltinFn,
}

impl fmt::Debug for OverloadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverloadEntry")
            .field("name", &self.name)
            .field("builtin", &self.builtin)
            .finish_non_exhaustive()
    }
}

impl OverloadEntry {
    pub fn call(&self, args: &CallArgs) -> Result<Value, BuiltinError> {
        debug!(overload = self.name, args = args.positional.len(), "dispatch");
        (self.dispatch)(args)
    }
}

static REGISTRY: Lazy<HashMap<Builtin, OverloadEntry>> =
    Lazy::new(|| Builtin::iter().map(|b| (b, overloads::entry_for(b))).collect());

/// The registered overload of `builtin`.
pub fn lookup(builtin: Builtin) -> &'static OverloadEntry {
    // The map holds every variant of `Builtin`.
    &REGISTRY[&builtin]
}

/// Read-only view of all registered overloads, in declaration order.
pub fn registry() -> impl Iterator<Item = &'static OverloadEntry> {
    Builtin::iter().map(lookup)
}

/// Native closure exposed to the evaluator as an ordinary host function.
pub type HostFn = dyn Fn(&CallArgs) -> Result<Value, BuiltinError>;

#[derive(Clone)]
pub struct HostFunction {
    name: String,
    func: Rc<HostFn>,
}

impl HostFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&CallArgs) -> Result<Value, BuiltinError> + 'static,
    ) -> Self {
        HostFunction {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Anything the evaluator can call.
#[derive(Clone)]
pub enum Callable {
    /// The plain host builtin.
    Builtin(Builtin),
    Overload(&'static OverloadEntry),
    Function(HostFunction),
}

impl Callable {
    pub fn call(&self, args: &CallArgs) -> Result<Value, BuiltinError> {
        match self {
            Callable::Builtin(b) => b.call_native(args),
            Callable::Overload(entry) => entry.call(args),
            Callable::Function(f) => (f.func)(args),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Builtin(b) => write!(f, "Builtin({})", b),
            Callable::Overload(entry) => write!(f, "Overload({})", entry.name),
            Callable::Function(func) => write!(f, "Function({})", func.name),
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Builtin(b) => write!(f, "<built-in function {}>", b),
            Callable::Overload(entry) => write!(f, "<overload {}>", entry.name),
            Callable::Function(func) => write!(f, "<function {}>", func.name),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Builtin(a), Callable::Builtin(b)) => a == b,
            (Callable::Overload(a), Callable::Overload(b)) => std::ptr::eq(*a, *b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(&a.func, &b.func),
            _ => false,
        }
    }
}

/// The overload to call in place of `target`.
///
/// Registered builtins map to their overload; every other callable is
/// returned unchanged, so this can be applied to any call target.
pub fn overload_of(target: Callable) -> Callable {
    match target {
        Callable::Builtin(b) => {
            debug!(builtin = b.name(), "overload_of");
            Callable::Overload(lookup(b))
        }
        other => other,
    }
}

/// [`overload_of`] lifted to values: non-callables pass through.
pub fn overload_of_value(value: Value) -> Value {
    match value {
        Value::Callable(c) => Value::Callable(overload_of(c)),
        other => other,
    }
}
