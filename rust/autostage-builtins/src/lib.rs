//! autostage builtins
//!
//! Overloads of the host builtins (`abs`, `float`, `int`, `len`, `print`,
//! `range`, `enumerate`) that run natively on host values and build graph
//! operations when handed staged ones. Converted code looks each call target
//! up with [`overload_of`] before calling it.
//!
//! Also provides [`eval_in_context`], which evaluates source text against
//! the scopes of an ancestor frame.

pub mod bridge;
pub mod classify;
pub mod context;
pub mod convert;
pub mod error;
pub mod eval;
pub mod native;
pub mod overloads;
pub mod registry;
pub mod value;

pub use classify::{classify, is_staged, ValueClass};
pub use context::{eval_in_context, CallStack, EvalArgs, Frame, Scope};
pub use error::BuiltinError;
pub use eval::{evaluate, execute};
pub use overloads::{abs_, enumerate_, float_, int_, len_, print_, range_};
pub use registry::{lookup, overload_of, overload_of_value, registry, Builtin, Callable, HostFunction, OverloadEntry};
pub use value::{Arg, CallArgs, RangeValue, Stream, Value};
