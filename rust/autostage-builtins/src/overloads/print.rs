use tracing::debug;

use crate::bridge;
use crate::classify::is_staged;
use crate::error::BuiltinError;
use crate::native::{self, PrintOptions};
use crate::registry::{Builtin, OverloadEntry};
use crate::value::{CallArgs, Value};

/// Check `keywords` against the recognized print options and bind them.
///
/// Unrecognized names fail before anything else happens, whichever path the
/// call would take.
pub fn print_options(keywords: &[(String, Value)]) -> Result<PrintOptions, BuiltinError> {
    let mut unknown: Vec<&str> = keywords
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| !PrintOptions::KEYWORDS.contains(name))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        unknown.dedup();
        return Err(BuiltinError::Validation(format!(
            "invalid keyword arguments: {}",
            unknown.join(", ")
        )));
    }

    let mut options = PrintOptions::default();
    for (name, value) in keywords {
        if let Some(slot) = options.slot_mut(name) {
            if !slot.is_omitted() {
                return Err(BuiltinError::type_error(format!(
                    "print() got multiple values for keyword argument '{}'",
                    name
                )));
            }
            *slot = value.clone().into();
        }
    }
    Ok(options)
}

/// Print immediately, or stage a host callback when any object is staged.
///
/// The native path returns `None`; the staged path returns the callback's
/// placeholder result.
pub fn print_(objects: &[Value], keywords: &[(String, Value)]) -> Result<Value, BuiltinError> {
    let options = print_options(keywords)?;
    if objects.iter().any(is_staged) {
        debug!(objects = objects.len(), "staged print");
        bridge::print_staged(objects, options)
    } else {
        native::print(objects, &options)
    }
}

fn print_native(args: &CallArgs) -> Result<Value, BuiltinError> {
    let options = print_options(&args.keywords)?;
    native::print(&args.positional, &options)
}

fn print_staged(args: &CallArgs) -> Result<Value, BuiltinError> {
    let options = print_options(&args.keywords)?;
    bridge::print_staged(&args.positional, options)
}

fn print_dispatch(args: &CallArgs) -> Result<Value, BuiltinError> {
    print_(&args.positional, &args.keywords)
}

pub(super) const PRINT: OverloadEntry = OverloadEntry {
    name: "print_",
    builtin: Builtin::Print,
    native_impl: print_native,
    staged_impl: print_staged,
    dispatch: print_dispatch,
};
