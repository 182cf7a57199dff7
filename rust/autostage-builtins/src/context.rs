//! Evaluation against an ancestor's variable scope.
//!
//! Callers pass their scopes explicitly: a [`CallStack`] records one
//! [`Frame`] per active function, innermost last.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::BuiltinError;
use crate::value::Value;

/// A shared, mutable set of variable bindings.
///
/// Clones refer to the same bindings.
#[derive(Clone, Default)]
pub struct Scope {
    vars: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.borrow().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.vars.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.vars.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn same(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.vars, &other.vars)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let scope = Scope::new();
        for (k, v) in iter {
            scope.set(k, v);
        }
        scope
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.vars.borrow().keys()).finish()
    }
}

/// The variable environment of one active function.
#[derive(Debug, Clone)]
pub struct Frame {
    name: String,
    globals: Scope,
    locals: Scope,
}

impl Frame {
    pub fn new(name: impl Into<String>, globals: Scope, locals: Scope) -> Self {
        Frame {
            name: name.into(),
            globals,
            locals,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    pub fn locals(&self) -> &Scope {
        &self.locals
    }
}

/// Active frames, outermost first.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost frame.
    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// The frame `levels` activations above the caller of the stack.
    ///
    /// Level 0 is the activation doing the lookup, which has no frame here;
    /// level 1 is the innermost frame.
    pub fn ancestor(&self, levels: usize) -> Result<&Frame, BuiltinError> {
        let depth = self.frames.len();
        if levels == 0 || levels > depth {
            return Err(BuiltinError::FrameResolution {
                requested: levels,
                depth,
            });
        }
        Ok(&self.frames[depth - levels])
    }
}

/// Arguments of an evaluation: the source plus optional scope overrides.
#[derive(Debug, Clone)]
pub struct EvalArgs {
    pub target: String,
    pub globals: Option<Scope>,
    pub locals: Option<Scope>,
}

impl EvalArgs {
    pub fn new(target: impl Into<String>) -> Self {
        EvalArgs {
            target: target.into(),
            globals: None,
            locals: None,
        }
    }

    pub fn with_globals(mut self, globals: Scope) -> Self {
        self.globals = Some(globals);
        self
    }

    pub fn with_locals(mut self, locals: Scope) -> Self {
        self.locals = Some(locals);
        self
    }
}

/// Run `primitive` on `args.target` with the bindings of the frame
/// `caller_level_delta + 1` levels up.
///
/// A delta of 0 selects the immediate caller. Scopes supplied in `args`
/// replace the frame's own.
pub fn eval_in_context<F>(
    primitive: F,
    args: EvalArgs,
    stack: &CallStack,
    caller_level_delta: usize,
) -> Result<Value, BuiltinError>
where
    F: FnOnce(&str, &Scope, &Scope) -> Result<Value, BuiltinError>,
{
    let frame = stack.ancestor(caller_level_delta + 1)?;
    debug!(frame = frame.name(), caller_level_delta, "eval in context");
    let globals = args.globals.unwrap_or_else(|| frame.globals.clone());
    let locals = args.locals.unwrap_or_else(|| frame.locals.clone());
    primitive(&args.target, &globals, &locals)
}
