//! Overloads of the supported builtins.
//!
//! Each builtin gets a native half (plain host semantics), a staged half
//! (graph construction), and a dispatcher that classifies the arguments.

mod enumerate;
mod len;
mod numeric;
mod print;
mod range;

pub use enumerate::enumerate_;
pub use len::len_;
pub use numeric::{abs_, float_, int_};
pub use print::{print_, print_options};
pub use range::range_;

use autostage_graph::Symbolic;

use crate::classify::symbolic_array;
use crate::error::BuiltinError;
use crate::registry::{Builtin, OverloadEntry};
use crate::value::Value;

pub(crate) fn entry_for(builtin: Builtin) -> OverloadEntry {
    match builtin {
        Builtin::Abs => numeric::ABS,
        Builtin::Float => numeric::FLOAT,
        Builtin::Int => numeric::INT,
        Builtin::Len => len::LEN,
        Builtin::Print => print::PRINT,
        Builtin::Range => range::RANGE,
        Builtin::Enumerate => enumerate::ENUMERATE,
    }
}

/// The symbolic array a staged half was handed, or a `Type` error.
fn expect_symbolic<'a>(func: &str, value: &'a Value) -> Result<&'a Symbolic, BuiltinError> {
    symbolic_array(value).ok_or_else(|| {
        BuiltinError::type_error(format!(
            "{}() staged path expects a symbolic array, got '{}'",
            func,
            value.type_name()
        ))
    })
}
