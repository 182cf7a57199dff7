//! Host value representation seen by the overlay.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use autostage_graph::{Dataset, Symbolic, TensorArray};

use crate::error::BuiltinError;
use crate::registry::Callable;

/// Runtime values: immediate host values plus handles to staged values.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Range(RangeValue),
    Stream(Stream),
    Callable(Callable),
    Tensor(Symbolic),
    TensorArray(TensorArray),
    Dataset(Dataset),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Host type name, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Range(_) => "range",
            Value::Stream(_) => "stream",
            Value::Callable(Callable::Function(_)) => "function",
            Value::Callable(_) => "builtin_function_or_method",
            Value::Tensor(_) => "Tensor",
            Value::TensorArray(_) => "TensorArray",
            Value::Dataset(_) => "Dataset",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(l) | Value::Tuple(l) => !l.is_empty(),
            Value::Range(r) => r.len() > 0,
            _ => true,
        }
    }

    /// Integer view accepted where the host wants an index (`int` or `bool`).
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Integer argument or the host's "cannot be interpreted as an integer".
    pub fn expect_index(&self) -> Result<i64, BuiltinError> {
        self.as_index().ok_or_else(|| {
            BuiltinError::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                self.type_name()
            ))
        })
    }

    /// Elements of a natively iterable value.
    pub fn iterate(&self) -> Result<Vec<Value>, BuiltinError> {
        match self {
            Value::List(items) | Value::Tuple(items) => Ok(items.clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Bytes(b) => Ok(b.iter().map(|&x| Value::Int(x as i64)).collect()),
            Value::Range(r) => Ok(r.iter().map(Value::Int).collect()),
            other => Err(BuiltinError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Quoted form used inside containers and by `repr`.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => quote_str(s),
            Value::Bytes(b) => quote_bytes(b),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "{}", quote_bytes(b)),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                if parts.len() == 1 {
                    write!(f, "({},)", parts[0])
                } else {
                    write!(f, "({})", parts.join(", "))
                }
            }
            Value::Range(r) => write!(f, "{}", r),
            Value::Stream(s) => write!(f, "{}", s),
            Value::Callable(c) => write!(f, "{}", c),
            Value::Tensor(t) => write!(f, "{}", t),
            Value::TensorArray(a) => write!(
                f,
                "<TensorArray {} dtype={}>",
                a.handle().id(),
                a.element_dtype()
            ),
            Value::Dataset(d) => write!(f, "<Dataset cardinality={}>", d.cardinality()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (None, None) => true,
            (Bool(_) | Int(_), Bool(_) | Int(_)) => self.as_index() == other.as_index(),
            (Float(a), Float(b)) => a == b,
            (Float(a), Int(_) | Bool(_)) => other.as_index().map(|b| b as f64) == Some(*a),
            (Int(_) | Bool(_), Float(b)) => self.as_index().map(|a| a as f64) == Some(*b),
            (Str(a), Str(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (List(a), List(b)) | (Tuple(a), Tuple(b)) => a == b,
            (Range(a), Range(b)) => a == b,
            (Stream(a), Stream(b)) => a == b,
            (Callable(a), Callable(b)) => a == b,
            (Tensor(a), Tensor(b)) => a == b,
            (TensorArray(a), TensorArray(b)) => a == b,
            (Dataset(a), Dataset(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Symbolic> for Value {
    fn from(s: Symbolic) -> Self {
        Value::Tensor(s)
    }
}

/// Float rendering that matches the host's `repr`: integral values keep a
/// trailing `.0`, large and tiny magnitudes use exponent notation.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let s = format!("{:e}", x);
        let (mantissa, exp) = s.split_once('e').unwrap_or((&s, "0"));
        let (sign, digits) = match exp.strip_prefix('-') {
            Some(d) => ("-", d),
            None => ("+", exp),
        };
        return format!("{}e{}{:0>2}", mantissa, sign, digits);
    }
    if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn quote_bytes(b: &[u8]) -> String {
    let mut out = String::from("b'");
    for &byte in b {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    out.push('\'');
    out
}

// ── Ranges ──────────────────────────────────────────────────────────────

/// Lazy host range.
#[derive(Debug, Clone, Copy)]
pub struct RangeValue {
    start: i64,
    stop: i64,
    step: i64,
}

impl RangeValue {
    pub fn new(start: i64, stop: i64, step: i64) -> Result<Self, BuiltinError> {
        if step == 0 {
            return Err(BuiltinError::value_error("range() arg 3 must not be zero"));
        }
        Ok(RangeValue { start, stop, step })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn stop(&self) -> i64 {
        self.stop
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn len(&self) -> usize {
        let (lo, hi, step) = if self.step > 0 {
            (self.start as i128, self.stop as i128, self.step as i128)
        } else {
            (self.stop as i128, self.start as i128, -(self.step as i128))
        };
        if lo >= hi {
            0
        } else {
            ((hi - lo - 1) / step + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let RangeValue { start, step, .. } = *self;
        // Every value lies between start and stop, so the wrapped sum is exact.
        (0..self.len() as u64).map(move |i| start.wrapping_add(step.wrapping_mul(i as i64)))
    }
}

/// Ranges compare as the sequences they produce.
impl PartialEq for RangeValue {
    fn eq(&self, other: &Self) -> bool {
        let n = self.len();
        n == other.len()
            && (n == 0 || (self.start == other.start && (n == 1 || self.step == other.step)))
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.step == 1 {
            write!(f, "range({}, {})", self.start, self.stop)
        } else {
            write!(f, "range({}, {}, {})", self.start, self.stop, self.step)
        }
    }
}

// ── Streams ─────────────────────────────────────────────────────────────

/// Print destination.
#[derive(Debug, Clone)]
pub enum Stream {
    Stdout,
    Stderr,
    /// In-memory sink; clones share the buffer.
    Buffer(Rc<RefCell<String>>),
}

impl Stream {
    pub fn buffer() -> Self {
        Stream::Buffer(Rc::new(RefCell::new(String::new())))
    }

    /// Text written so far to a buffer stream.
    pub fn contents(&self) -> Option<String> {
        match self {
            Stream::Buffer(b) => Some(b.borrow().clone()),
            _ => None,
        }
    }

    pub fn write_str(&self, text: &str) -> std::io::Result<()> {
        match self {
            Stream::Stdout => std::io::stdout().lock().write_all(text.as_bytes()),
            Stream::Stderr => std::io::stderr().lock().write_all(text.as_bytes()),
            Stream::Buffer(b) => {
                b.borrow_mut().push_str(text);
                Ok(())
            }
        }
    }

    pub fn flush(&self) -> std::io::Result<()> {
        match self {
            Stream::Stdout => std::io::stdout().flush(),
            Stream::Stderr => std::io::stderr().flush(),
            Stream::Buffer(_) => Ok(()),
        }
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Stream::Stdout, Stream::Stdout) | (Stream::Stderr, Stream::Stderr) => true,
            (Stream::Buffer(a), Stream::Buffer(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => write!(f, "<stdout>"),
            Stream::Stderr => write!(f, "<stderr>"),
            Stream::Buffer(_) => write!(f, "<buffer>"),
        }
    }
}

// ── Arguments ───────────────────────────────────────────────────────────

/// An optional argument slot.
///
/// `Omitted` means the caller did not supply the argument at all; it is
/// distinct from an explicitly supplied `Value::None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Arg {
    #[default]
    Omitted,
    Given(Value),
}

impl Arg {
    pub fn is_omitted(&self) -> bool {
        matches!(self, Arg::Omitted)
    }

    pub fn given(&self) -> Option<&Value> {
        match self {
            Arg::Given(v) => Some(v),
            Arg::Omitted => None,
        }
    }

    /// The supplied value, or `default` when omitted.
    pub fn or(self, default: Value) -> Value {
        match self {
            Arg::Given(v) => v,
            Arg::Omitted => default,
        }
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Given(v)
    }
}

/// A call in uniform form: positional values and keyword pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new(positional: Vec<Value>) -> Self {
        CallArgs {
            positional,
            keywords: Vec::new(),
        }
    }

    pub fn keyword(mut self, name: impl Into<String>, value: Value) -> Self {
        self.keywords.push((name.into(), value));
        self
    }

    /// Bind to the parameter list `params`, the first `required` of which
    /// must be supplied. Unsupplied optional slots stay `Arg::Omitted`.
    pub fn bind<const N: usize>(
        &self,
        func: &str,
        params: &[&str; N],
        required: usize,
    ) -> Result<[Arg; N], BuiltinError> {
        if self.positional.len() > params.len() {
            return Err(BuiltinError::type_error(format!(
                "{}() takes at most {} arguments ({} given)",
                func,
                params.len(),
                self.positional.len()
            )));
        }
        let mut slots: [Arg; N] = std::array::from_fn(|_| Arg::Omitted);
        for (slot, value) in slots.iter_mut().zip(&self.positional) {
            *slot = Arg::Given(value.clone());
        }
        for (name, value) in &self.keywords {
            let idx = params.iter().position(|p| *p == name.as_str()).ok_or_else(|| {
                BuiltinError::type_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    func, name
                ))
            })?;
            if !slots[idx].is_omitted() {
                return Err(BuiltinError::type_error(format!(
                    "{}() got multiple values for argument '{}'",
                    func, name
                )));
            }
            slots[idx] = Arg::Given(value.clone());
        }
        if let Some(missing) = slots.iter().take(required).position(Arg::is_omitted) {
            return Err(BuiltinError::type_error(format!(
                "{}() missing required argument '{}'",
                func, params[missing]
            )));
        }
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_rendering_matches_host_repr() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn container_rendering_quotes_strings() {
        let v = Value::List(vec![Value::Int(1), Value::str("a"), Value::None]);
        assert_eq!(v.to_string(), "[1, 'a', None]");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(Value::Bytes(b"hi\n".to_vec()).to_string(), "b'hi\\n'");
        assert_eq!(Value::str("it's").repr(), "\"it's\"");
    }

    #[test]
    fn numeric_equality_crosses_int_float_bool() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Int(1), Value::str("1"));
    }

    #[test]
    fn range_len_and_equality() {
        let r = RangeValue::new(0, 10, 3).unwrap();
        assert_eq!(r.len(), 4);
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![0, 3, 6, 9]);
        assert_eq!(RangeValue::new(5, 2, -1).unwrap().len(), 3);
        assert_eq!(RangeValue::new(2, 2, 1).unwrap(), RangeValue::new(0, 0, 1).unwrap());
        assert!(RangeValue::new(0, 1, 0).is_err());
    }

    #[test]
    fn full_width_ranges_iterate() {
        let r = RangeValue::new(i64::MIN, i64::MAX, 1).unwrap();
        assert_eq!(r.len(), u64::MAX as usize);
        assert_eq!(r.iter().take(2).collect::<Vec<_>>(), vec![i64::MIN, i64::MIN + 1]);

        let r = RangeValue::new(i64::MAX, i64::MIN, -(1 << 62)).unwrap();
        assert_eq!(
            r.iter().collect::<Vec<_>>(),
            vec![i64::MAX, i64::MAX - (1 << 62), -1, (1 << 62) - 1]
        );
    }

    #[test]
    fn bind_distinguishes_omitted_from_none() {
        let args = CallArgs::new(vec![Value::Int(1)]).keyword("base", Value::None);
        let slots = args.bind("int", &["x", "base"], 0).unwrap();
        assert_eq!(slots[0], Arg::Given(Value::Int(1)));
        assert_eq!(slots[1], Arg::Given(Value::None));

        let slots = CallArgs::new(vec![]).bind("int", &["x", "base"], 0).unwrap();
        assert!(slots.iter().all(Arg::is_omitted));
    }

    #[test]
    fn bind_reports_host_style_errors() {
        let err = CallArgs::new(vec![Value::Int(1), Value::Int(2)])
            .bind("abs", &["x"], 1)
            .unwrap_err();
        assert_eq!(err.to_string(), "TypeError: abs() takes at most 1 arguments (2 given)");

        let err = CallArgs::new(vec![]).bind("len", &["obj"], 1).unwrap_err();
        assert!(err.to_string().contains("missing required argument 'obj'"));

        let err = CallArgs::new(vec![Value::Int(1)])
            .keyword("x", Value::Int(2))
            .bind("float", &["x"], 0)
            .unwrap_err();
        assert!(err.to_string().contains("multiple values"));
    }
}
