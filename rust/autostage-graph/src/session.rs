//! Reference execution engine for staged graphs.

use std::collections::HashMap;

use num_traits::ToPrimitive;
use thiserror::Error;
use tracing::debug;

use crate::dtype::DType;
use crate::graph::{range_len, Graph, NodeId, Op, Symbolic};
use crate::shape::{Shape, ShapeError};
use crate::tensor::{Tensor, TensorData};

/// Failures that only manifest when a graph is executed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("assertion failed: [{message}]")]
    AssertionFailed { message: String },
    #[error("placeholder '{name}' was not fed")]
    MissingFeed { name: String },
    #[error("placeholder '{name}' expects {expected}, fed {got}")]
    FeedMismatch {
        name: String,
        expected: String,
        got: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("host callback '{name}' failed: {message}")]
    Callback { name: String, message: String },
    #[error("fetched value belongs to a different graph")]
    ForeignGraph,
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Placeholder values for one run.
#[derive(Debug, Clone, Default)]
pub struct Feeds {
    values: HashMap<NodeId, Tensor>,
}

impl Feeds {
    pub fn new() -> Self {
        Feeds::default()
    }

    /// Supply `value` for the placeholder `target`.
    pub fn feed(mut self, target: &Symbolic, value: Tensor) -> Self {
        self.values.insert(target.id(), value);
        self
    }

    pub fn insert(&mut self, target: &Symbolic, value: Tensor) {
        self.values.insert(target.id(), value);
    }
}

/// Evaluates fetched nodes lazily, memoizing every node it computes.
///
/// A session runs exactly one graph; conditional branches that are not taken
/// are never evaluated.
pub struct Session<'g> {
    graph: &'g Graph,
    feeds: Feeds,
    memo: HashMap<NodeId, Tensor>,
}

impl<'g> Session<'g> {
    pub fn new(graph: &'g Graph, feeds: Feeds) -> Self {
        Session {
            graph,
            feeds,
            memo: HashMap::new(),
        }
    }

    /// Build a session over `fetch`'s graph and evaluate `fetch`.
    pub fn run(fetch: &Symbolic, feeds: Feeds) -> Result<Tensor, ExecError> {
        let mut session = Session::new(fetch.graph(), feeds);
        session.fetch(fetch)
    }

    pub fn fetch(&mut self, target: &Symbolic) -> Result<Tensor, ExecError> {
        if target.graph() != self.graph {
            return Err(ExecError::ForeignGraph);
        }
        debug!(node = %target.id(), "fetch");
        self.eval(target.id())
    }

    fn eval(&mut self, id: NodeId) -> Result<Tensor, ExecError> {
        if let Some(done) = self.memo.get(&id) {
            return Ok(done.clone());
        }
        let node = self.graph.node(id);
        let dtype = node.dtype;
        let out = match node.op {
            Op::Placeholder { name } => {
                let value = self
                    .feeds
                    .values
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| ExecError::MissingFeed { name: name.clone() })?;
                if value.dtype() != dtype || !node.shape.accepts(value.shape()) {
                    return Err(ExecError::FeedMismatch {
                        name,
                        expected: format!("{} {}", dtype, node.shape),
                        got: format!("{} {}", value.dtype(), value.shape()),
                    });
                }
                value
            }
            Op::Const(t) => t,
            Op::Abs(x) => abs(&self.eval(x)?)?,
            Op::Cast(x) => cast(&self.eval(x)?, dtype)?,
            Op::StringToNumber(x) => string_to_number(&self.eval(x)?, dtype)?,
            Op::Shape(x) => {
                let t = self.eval(x)?;
                let dims = t.shape().dims().iter().map(|&d| d as i64).collect::<Vec<_>>();
                let len = dims.len();
                Tensor::from_ints(dims, Shape::vector(len), DType::I32)?
            }
            Op::Rank(x) => Tensor::scalar_int(self.eval(x)?.ndim() as i64, DType::I32),
            Op::Index { input, index } => self.eval(input)?.slice(index)?,
            Op::Greater(a, b) => {
                let (a, b) = (self.eval(a)?, self.eval(b)?);
                let values = zip_f64(&a, &b)?;
                let shape = broadcast_shape(&a, &b);
                Tensor::from_bools(values.into_iter().map(|(x, y)| x > y).collect(), shape)?
            }
            Op::Maximum(a, b) => {
                let (a, b) = (self.eval(a)?, self.eval(b)?);
                maximum(&a, &b)?
            }
            Op::Range {
                start,
                limit,
                delta,
            } => {
                let start = self.eval(start)?;
                let limit = self.eval(limit)?;
                let delta = self.eval(delta)?;
                range(&start, &limit, &delta, dtype)?
            }
            Op::Cond {
                pred,
                then_branch,
                else_branch,
            } => {
                let pred = self.eval(pred)?;
                let taken = pred.to_bool().ok_or_else(|| {
                    ExecError::InvalidArgument(format!(
                        "cond predicate must be a scalar bool, got shape {}",
                        pred.shape()
                    ))
                })?;
                if taken {
                    self.eval(then_branch)?
                } else {
                    self.eval(else_branch)?
                }
            }
            Op::Assert { condition, data } => {
                let ok = self.eval(condition)?.to_bool().unwrap_or(false);
                if !ok {
                    let mut parts = Vec::with_capacity(data.len());
                    for d in data {
                        parts.push(self.eval(d)?.to_string());
                    }
                    return Err(ExecError::AssertionFailed {
                        message: parts.join(", "),
                    });
                }
                Tensor::scalar_bool(true)
            }
            Op::WithDependencies { deps, output } => {
                for d in deps {
                    self.eval(d)?;
                }
                self.eval(output)?
            }
            Op::StringJoin { inputs, separator } => {
                let mut parts = Vec::with_capacity(inputs.len());
                for i in inputs {
                    match self.eval(i)?.data() {
                        TensorData::Bytes(b) if b.len() == 1 => parts.push(b[0].clone()),
                        _ => {
                            return Err(ExecError::InvalidArgument(
                                "string_join expects scalar strings".to_string(),
                            ))
                        }
                    }
                }
                Tensor::scalar_string(parts.join(separator.as_bytes()))
            }
            Op::AsString(x) => {
                let t = self.eval(x)?;
                let strings = t.element_strings().into_iter().map(String::into_bytes).collect();
                Tensor::from_strings(strings, t.shape().clone())?
            }
            Op::ListFromTensors(items) => {
                let mut elements = Vec::with_capacity(items.len());
                for i in items {
                    elements.push(self.eval(i)?);
                }
                Tensor::list(elements)
            }
            Op::ListLength(x) | Op::TensorArraySize(x) => {
                let t = self.eval(x)?;
                let items = t.as_list().ok_or_else(|| {
                    ExecError::InvalidArgument(format!("expected a list, got {}", t.dtype()))
                })?;
                Tensor::scalar_int(items.len() as i64, DType::I32)
            }
            Op::TensorArrayNew {
                element_dtype,
                size,
            } => {
                let n = self.eval(size)?.to_i64().unwrap_or(0).max(0) as usize;
                Tensor::list(vec![zero(element_dtype); n])
            }
            Op::TensorArrayUnstack(x) => Tensor::list(self.eval(x)?.unstack()?),
            Op::HostCallback {
                callback,
                inputs,
                dummy_return,
            } => {
                let mut args = Vec::with_capacity(inputs.len());
                for i in inputs {
                    args.push(self.eval(i)?);
                }
                debug!(callback = callback.name(), args = args.len(), "host callback");
                let result = callback.call(&args).map_err(|message| ExecError::Callback {
                    name: callback.name().to_string(),
                    message,
                })?;
                if dummy_return {
                    Tensor::scalar_int(1, DType::I32)
                } else {
                    match result {
                        Some(t) if t.dtype() == dtype => t,
                        Some(t) => {
                            return Err(ExecError::Callback {
                                name: callback.name().to_string(),
                                message: format!("returned {}, expected {}", t.dtype(), dtype),
                            })
                        }
                        None => {
                            return Err(ExecError::Callback {
                                name: callback.name().to_string(),
                                message: "returned no value".to_string(),
                            })
                        }
                    }
                }
            }
        };
        self.memo.insert(id, out.clone());
        Ok(out)
    }
}

// ── Kernels ─────────────────────────────────────────────────────────────

fn abs(x: &Tensor) -> Result<Tensor, ExecError> {
    let shape = x.shape().clone();
    Ok(match x.data() {
        TensorData::Float(v) => {
            Tensor::from_floats(v.iter().map(|x| x.abs()).collect(), shape, x.dtype())?
        }
        TensorData::Int(v) => {
            Tensor::from_ints(v.iter().map(|x| x.wrapping_abs()).collect(), shape, x.dtype())?
        }
        _ => {
            return Err(ExecError::InvalidArgument(format!(
                "abs is not defined for {} values",
                x.dtype()
            )))
        }
    })
}

fn cast(x: &Tensor, to: DType) -> Result<Tensor, ExecError> {
    let shape = x.shape().clone();
    let as_f64: Vec<f64> = match x.data() {
        TensorData::Float(v) => v.clone(),
        TensorData::Int(v) => v.iter().map(|&i| i as f64).collect(),
        TensorData::Bool(v) => v.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect(),
        _ => {
            return Err(ExecError::InvalidArgument(format!(
                "cannot cast {} to {}",
                x.dtype(),
                to
            )))
        }
    };
    Ok(match to {
        DType::F32 | DType::F64 => Tensor::from_floats(as_f64, shape, to)?,
        DType::I32 | DType::I64 => {
            let ints = match x.data() {
                TensorData::Int(v) => v.clone(),
                _ => as_f64
                    .iter()
                    .map(|f| {
                        f.trunc().to_i64().ok_or_else(|| {
                            ExecError::InvalidArgument(format!("cannot cast {} to {}", f, to))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            };
            Tensor::from_ints(ints, shape, to)?
        }
        DType::Bool => Tensor::from_bools(as_f64.iter().map(|&f| f != 0.0).collect(), shape)?,
        DType::String | DType::Variant => {
            return Err(ExecError::InvalidArgument(format!("cannot cast to {}", to)))
        }
    })
}

fn string_to_number(x: &Tensor, to: DType) -> Result<Tensor, ExecError> {
    let TensorData::Bytes(items) = x.data() else {
        return Err(ExecError::InvalidArgument(format!(
            "string_to_number expects strings, got {}",
            x.dtype()
        )));
    };
    let shape = x.shape().clone();
    let texts = items
        .iter()
        .map(|b| String::from_utf8_lossy(b).trim().to_string())
        .collect::<Vec<_>>();
    let failed = |s: &str| {
        ExecError::InvalidArgument(format!(
            "StringToNumberOp could not correctly convert string: {}",
            s
        ))
    };
    if to.is_integer() {
        let ints = texts
            .iter()
            .map(|s| s.parse::<i64>().map_err(|_| failed(s.as_str())))
            .collect::<Result<Vec<_>, _>>()?;
        if to == DType::I32 && ints.iter().any(|&i| i32::try_from(i).is_err()) {
            return Err(ExecError::InvalidArgument(
                "StringToNumberOp value out of range for i32".to_string(),
            ));
        }
        Ok(Tensor::from_ints(ints, shape, to)?)
    } else {
        let floats = texts
            .iter()
            .map(|s| s.parse::<f64>().map_err(|_| failed(s.as_str())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Tensor::from_floats(floats, shape, to)?)
    }
}

fn numeric_f64(t: &Tensor) -> Result<Vec<f64>, ExecError> {
    match t.data() {
        TensorData::Float(v) => Ok(v.clone()),
        TensorData::Int(v) => Ok(v.iter().map(|&i| i as f64).collect()),
        _ => Err(ExecError::InvalidArgument(format!(
            "expected a numeric tensor, got {}",
            t.dtype()
        ))),
    }
}

/// Pair up elements, broadcasting scalars.
fn zip_f64(a: &Tensor, b: &Tensor) -> Result<Vec<(f64, f64)>, ExecError> {
    let (x, y) = (numeric_f64(a)?, numeric_f64(b)?);
    pair_up(&x, &y, a, b)
}

fn pair_up<T: Copy>(x: &[T], y: &[T], a: &Tensor, b: &Tensor) -> Result<Vec<(T, T)>, ExecError> {
    if a.shape().is_scalar() {
        Ok(y.iter().map(|&v| (x[0], v)).collect())
    } else if b.shape().is_scalar() {
        Ok(x.iter().map(|&v| (v, y[0])).collect())
    } else if a.shape() == b.shape() {
        Ok(x.iter().copied().zip(y.iter().copied()).collect())
    } else {
        Err(ShapeError::Mismatch {
            shape_a: a.shape().dims().to_vec(),
            shape_b: b.shape().dims().to_vec(),
        }
        .into())
    }
}

fn broadcast_shape(a: &Tensor, b: &Tensor) -> Shape {
    if a.shape().is_scalar() {
        b.shape().clone()
    } else {
        a.shape().clone()
    }
}

fn larger<T: PartialOrd + Copy>(pairs: Vec<(T, T)>) -> Vec<T> {
    pairs
        .into_iter()
        .map(|(x, y)| if y > x { y } else { x })
        .collect()
}

fn maximum(a: &Tensor, b: &Tensor) -> Result<Tensor, ExecError> {
    let shape = broadcast_shape(a, b);
    match (a.data(), b.data()) {
        (TensorData::Int(x), TensorData::Int(y)) => {
            Ok(Tensor::from_ints(larger(pair_up(x, y, a, b)?), shape, a.dtype())?)
        }
        _ => Ok(Tensor::from_floats(larger(zip_f64(a, b)?), shape, a.dtype())?),
    }
}

fn range(start: &Tensor, limit: &Tensor, delta: &Tensor, dtype: DType) -> Result<Tensor, ExecError> {
    let n = range_len(start, limit, delta)
        .ok_or_else(|| {
            ExecError::InvalidArgument(format!(
                "range arguments must be numeric scalars, got shapes {}, {}, {}",
                start.shape(),
                limit.shape(),
                delta.shape()
            ))
        })?
        .map_err(ExecError::InvalidArgument)?;
    match (start.to_i64(), delta.to_i64()) {
        (Some(s), Some(d)) if dtype.is_integer() => {
            // Every produced value lies between start and limit.
            let values = (0..n as i64).map(|i| s.wrapping_add(i.wrapping_mul(d))).collect();
            Ok(Tensor::from_ints(values, Shape::vector(n), dtype)?)
        }
        _ => {
            let (s, d) = (start.to_f64().unwrap_or(0.0), delta.to_f64().unwrap_or(0.0));
            let values = (0..n).map(|i| s + i as f64 * d).collect();
            Ok(Tensor::from_floats(values, Shape::vector(n), dtype)?)
        }
    }
}

fn zero(dtype: DType) -> Tensor {
    match dtype {
        DType::F32 | DType::F64 => Tensor::scalar_float(0.0, dtype),
        DType::I32 | DType::I64 => Tensor::scalar_int(0, dtype),
        DType::Bool => Tensor::scalar_bool(false),
        DType::String => Tensor::scalar_string(Vec::new()),
        DType::Variant => Tensor::list(Vec::new()),
    }
}
