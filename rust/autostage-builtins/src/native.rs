//! Plain host builtins.
//!
//! These are the immediate-value semantics every overload falls back to,
//! failures included.

use crate::error::BuiltinError;
use crate::value::{Arg, RangeValue, Stream, Value};

pub fn abs(x: &Value) -> Result<Value, BuiltinError> {
    match x {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| BuiltinError::value_error("integer overflow in abs()")),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(BuiltinError::type_error(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

pub fn float(x: &Value) -> Result<Value, BuiltinError> {
    match x {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),
        Value::Str(s) => parse_float(s),
        Value::Bytes(b) => parse_float(&String::from_utf8_lossy(b)),
        other => Err(BuiltinError::type_error(format!(
            "float() argument must be a string or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

fn parse_float(text: &str) -> Result<Value, BuiltinError> {
    let trimmed = text.trim();
    let digits_ok = !trimmed.contains("__") && !trimmed.starts_with('_') && !trimmed.ends_with('_');
    let cleaned = trimmed.replace('_', "");
    match cleaned.parse::<f64>() {
        Ok(v) if digits_ok && !cleaned.is_empty() => Ok(Value::Float(v)),
        _ => Err(BuiltinError::value_error(format!(
            "could not convert string to float: {}",
            Value::str(text).repr()
        ))),
    }
}

/// `int(x)` or `int(x, base)`; `base` left `Omitted` means no explicit base.
pub fn int(x: &Value, base: &Arg) -> Result<Value, BuiltinError> {
    let Some(base) = base.given() else {
        return match x {
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::Bool(b) => Ok(Value::Int(*b as i64)),
            Value::Float(f) => float_to_int(*f),
            Value::Str(s) => parse_int(s, 10),
            Value::Bytes(b) => parse_int(&String::from_utf8_lossy(b), 10),
            other => Err(BuiltinError::type_error(format!(
                "int() argument must be a string, a bytes-like object or a real number, not '{}'",
                other.type_name()
            ))),
        };
    };
    let base = base.expect_index()?;
    let text = match x {
        Value::Str(s) => s.clone(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        _ => {
            return Err(BuiltinError::type_error(
                "int() can't convert non-string with explicit base",
            ))
        }
    };
    if base != 0 && !(2..=36).contains(&base) {
        return Err(BuiltinError::value_error(
            "int() base must be >= 2 and <= 36, or 0",
        ));
    }
    parse_int(&text, base as u32)
}

fn float_to_int(f: f64) -> Result<Value, BuiltinError> {
    if f.is_nan() {
        return Err(BuiltinError::value_error("cannot convert float NaN to integer"));
    }
    if f.is_infinite() {
        return Err(BuiltinError::value_error(
            "cannot convert float infinity to integer",
        ));
    }
    let t = f.trunc();
    if t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return Err(BuiltinError::value_error("int too large to convert"));
    }
    Ok(Value::Int(t as i64))
}

/// Host integer literal parsing: optional sign, optional radix prefix
/// (required to match `base`, or selecting it when `base` is 0), and single
/// underscores between digits.
fn parse_int(text: &str, base: u32) -> Result<Value, BuiltinError> {
    let invalid = || {
        BuiltinError::value_error(format!(
            "invalid literal for int() with base {}: {}",
            base,
            Value::str(text).repr()
        ))
    };
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let lower = unsigned.to_ascii_lowercase();
    let prefixed = |p: &str| lower.starts_with(p);
    let (radix, digits) = match base {
        0 if prefixed("0x") => (16, &unsigned[2..]),
        0 if prefixed("0o") => (8, &unsigned[2..]),
        0 if prefixed("0b") => (2, &unsigned[2..]),
        0 => {
            let leading_zero = lower.len() > 1 && lower.starts_with('0');
            if leading_zero && !lower.trim_matches(|c| c == '0' || c == '_').is_empty() {
                return Err(invalid());
            }
            (10, unsigned)
        }
        16 if prefixed("0x") => (16, &unsigned[2..]),
        8 if prefixed("0o") => (8, &unsigned[2..]),
        2 if prefixed("0b") => (2, &unsigned[2..]),
        b => (b, unsigned),
    };
    // A prefix may be followed by one underscore before the first digit.
    let digits = if digits.len() != unsigned.len() {
        digits.strip_prefix('_').unwrap_or(digits)
    } else {
        digits
    };
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
        || !digits.chars().all(|c| c == '_' || c.is_digit(radix))
    {
        return Err(invalid());
    }
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    let magnitude = i128::from_str_radix(&cleaned, radix)
        .map_err(|_| BuiltinError::value_error("int too large to convert"))?;
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed)
        .map(Value::Int)
        .map_err(|_| BuiltinError::value_error("int too large to convert"))
}

pub fn len(x: &Value) -> Result<Value, BuiltinError> {
    let n = match x {
        Value::Str(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(items) | Value::Tuple(items) => items.len(),
        Value::Range(r) => r.len(),
        Value::Dataset(d) => d.cardinality(),
        other => {
            return Err(BuiltinError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(n as i64))
}

/// Keyword options of `print`; `Omitted` slots take the host defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintOptions {
    pub sep: Arg,
    pub end: Arg,
    pub file: Arg,
    pub flush: Arg,
}

impl PrintOptions {
    pub const KEYWORDS: [&'static str; 4] = ["sep", "end", "file", "flush"];

    pub(crate) fn slot_mut(&mut self, keyword: &str) -> Option<&mut Arg> {
        match keyword {
            "sep" => Some(&mut self.sep),
            "end" => Some(&mut self.end),
            "file" => Some(&mut self.file),
            "flush" => Some(&mut self.flush),
            _ => None,
        }
    }
}

fn text_option(name: &str, arg: &Arg, default: &str) -> Result<String, BuiltinError> {
    match arg.given() {
        None | Some(Value::None) => Ok(default.to_string()),
        Some(Value::Str(s)) => Ok(s.clone()),
        Some(other) => Err(BuiltinError::type_error(format!(
            "{} must be None or a string, not {}",
            name,
            other.type_name()
        ))),
    }
}

pub fn print(objects: &[Value], options: &PrintOptions) -> Result<Value, BuiltinError> {
    let sep = text_option("sep", &options.sep, " ")?;
    let end = text_option("end", &options.end, "\n")?;
    let stream = match options.file.given() {
        None | Some(Value::None) => Stream::Stdout,
        Some(Value::Stream(s)) => s.clone(),
        Some(other) => {
            return Err(BuiltinError::type_error(format!(
                "'{}' object has no attribute 'write'",
                other.type_name()
            )))
        }
    };
    let flush = options.flush.given().is_some_and(Value::is_truthy);

    let line: Vec<String> = objects.iter().map(Value::to_string).collect();
    stream.write_str(&line.join(&sep))?;
    stream.write_str(&end)?;
    if flush {
        stream.flush()?;
    }
    Ok(Value::None)
}

pub fn range(start_or_stop: &Value, stop: &Arg, step: &Arg) -> Result<Value, BuiltinError> {
    let first = start_or_stop.expect_index()?;
    let r = match (stop.given(), step.given()) {
        (None, None) => RangeValue::new(0, first, 1)?,
        (Some(stop), None) => RangeValue::new(first, stop.expect_index()?, 1)?,
        (Some(stop), Some(step)) => {
            RangeValue::new(first, stop.expect_index()?, step.expect_index()?)?
        }
        (None, Some(_)) => {
            return Err(BuiltinError::type_error("range() step given without stop"))
        }
    };
    Ok(Value::Range(r))
}

pub fn enumerate(iterable: &Value, start: &Value) -> Result<Value, BuiltinError> {
    let start = start.expect_index()?;
    let pairs = iterable
        .iterate()?
        .into_iter()
        .zip(start..)
        .map(|(item, i)| Value::Tuple(vec![Value::Int(i), item]))
        .collect();
    Ok(Value::List(pairs))
}
