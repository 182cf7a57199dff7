//! Staged computation graph.
//!
//! Values built here are descriptions of work; nothing executes until a
//! [`crate::session::Session`] runs a fetched node. Constructors perform
//! static shape inference and fold constants, so some failures surface at
//! construction time and others only when the graph is run.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

use crate::dtype::DType;
use crate::shape::{Shape, ShapeError, StaticShape};
use crate::tensor::Tensor;

/// Index of a node in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Failures detected while a graph is being built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{op}: expected {expected} input, got {got}")]
    DTypeMismatch {
        op: &'static str,
        expected: DType,
        got: DType,
    },
    #[error("{0}: input belongs to a different graph")]
    ForeignGraph(&'static str),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Native closure invoked by the engine with materialized inputs.
pub type CallbackFn = dyn Fn(&[Tensor]) -> Result<Option<Tensor>, String>;

/// A named host callback stored in a graph node.
#[derive(Clone)]
pub struct HostCallback {
    name: String,
    func: Rc<CallbackFn>,
}

impl HostCallback {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&[Tensor]) -> Result<Option<Tensor>, String> + 'static,
    ) -> Self {
        HostCallback {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, inputs: &[Tensor]) -> Result<Option<Tensor>, String> {
        (self.func)(inputs)
    }
}

impl fmt::Debug for HostCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostCallback({})", self.name)
    }
}

/// Recorded operations.
#[derive(Debug, Clone)]
pub enum Op {
    Placeholder { name: String },
    Const(Tensor),
    Abs(NodeId),
    /// Numeric cast to the node's dtype.
    Cast(NodeId),
    /// Parse byte strings into the node's dtype.
    StringToNumber(NodeId),
    Shape(NodeId),
    Rank(NodeId),
    /// Slice along the leading dimension.
    Index { input: NodeId, index: usize },
    Greater(NodeId, NodeId),
    Maximum(NodeId, NodeId),
    Range {
        start: NodeId,
        limit: NodeId,
        delta: NodeId,
    },
    /// Only the taken branch is evaluated.
    Cond {
        pred: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    Assert {
        condition: NodeId,
        data: Vec<NodeId>,
    },
    /// Evaluate `deps` for their effects, then produce `output`.
    WithDependencies { deps: Vec<NodeId>, output: NodeId },
    StringJoin {
        inputs: Vec<NodeId>,
        separator: String,
    },
    AsString(NodeId),
    ListFromTensors(Vec<NodeId>),
    ListLength(NodeId),
    TensorArrayNew { element_dtype: DType, size: NodeId },
    TensorArrayUnstack(NodeId),
    TensorArraySize(NodeId),
    HostCallback {
        callback: HostCallback,
        inputs: Vec<NodeId>,
        dummy_return: bool,
    },
}

impl Op {
    fn mnemonic(&self) -> &'static str {
        match self {
            Op::Placeholder { .. } => "placeholder",
            Op::Const(_) => "const",
            Op::Abs(_) => "abs",
            Op::Cast(_) => "cast",
            Op::StringToNumber(_) => "string_to_number",
            Op::Shape(_) => "shape",
            Op::Rank(_) => "rank",
            Op::Index { .. } => "index",
            Op::Greater(..) => "greater",
            Op::Maximum(..) => "maximum",
            Op::Range { .. } => "range",
            Op::Cond { .. } => "cond",
            Op::Assert { .. } => "assert",
            Op::WithDependencies { .. } => "with_dependencies",
            Op::StringJoin { .. } => "string_join",
            Op::AsString(_) => "as_string",
            Op::ListFromTensors(_) => "list_from_tensors",
            Op::ListLength(_) => "list_length",
            Op::TensorArrayNew { .. } => "tensor_array",
            Op::TensorArrayUnstack(_) => "tensor_array_unstack",
            Op::TensorArraySize(_) => "tensor_array_size",
            Op::HostCallback { .. } => "host_callback",
        }
    }

    fn inputs(&self) -> Vec<NodeId> {
        match self {
            Op::Placeholder { .. } | Op::Const(_) => vec![],
            Op::Abs(x)
            | Op::Cast(x)
            | Op::StringToNumber(x)
            | Op::Shape(x)
            | Op::Rank(x)
            | Op::AsString(x)
            | Op::ListLength(x)
            | Op::TensorArrayUnstack(x)
            | Op::TensorArraySize(x) => vec![*x],
            Op::Index { input, .. } => vec![*input],
            Op::Greater(a, b) | Op::Maximum(a, b) => vec![*a, *b],
            Op::Range {
                start,
                limit,
                delta,
            } => vec![*start, *limit, *delta],
            Op::Cond {
                pred,
                then_branch,
                else_branch,
            } => vec![*pred, *then_branch, *else_branch],
            Op::Assert { condition, data } => {
                let mut v = vec![*condition];
                v.extend(data);
                v
            }
            Op::WithDependencies { deps, output } => {
                let mut v = deps.clone();
                v.push(*output);
                v
            }
            Op::StringJoin { inputs, .. }
            | Op::ListFromTensors(inputs)
            | Op::HostCallback { inputs, .. } => inputs.clone(),
            Op::TensorArrayNew { size, .. } => vec![*size],
        }
    }
}

/// A node in the computation graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub dtype: DType,
    pub shape: StaticShape,
}

#[derive(Debug, Default)]
struct GraphInner {
    nodes: Vec<Node>,
}

/// Shared handle to an append-only staged graph.
///
/// Cloning the handle does not copy the graph; all clones append to the same
/// node list.
#[derive(Clone, Default)]
pub struct Graph {
    inner: Rc<RefCell<GraphInner>>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Graph({} nodes)", self.len())
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Handle to a staged value: a node plus its construction-time metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbolic {
    graph: Graph,
    id: NodeId,
    dtype: DType,
    shape: StaticShape,
}

impl Symbolic {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &StaticShape {
        &self.shape
    }
}

impl fmt::Display for Symbolic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<staged {} shape={} dtype={}>",
            self.id, self.shape, self.dtype
        )
    }
}

/// A staged array buffer with its own size query.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorArray {
    handle: Symbolic,
    element_dtype: DType,
    static_size: Option<usize>,
}

impl TensorArray {
    pub fn handle(&self) -> &Symbolic {
        &self.handle
    }

    pub fn element_dtype(&self) -> DType {
        self.element_dtype
    }

    /// Number of elements, when known at construction time.
    pub fn static_size(&self) -> Option<usize> {
        self.static_size
    }

    /// Staged element count.
    pub fn size(&self) -> Symbolic {
        self.handle.graph.add_node(
            Op::TensorArraySize(self.handle.id),
            DType::I32,
            StaticShape::scalar(),
        )
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the node at `id`.
    ///
    /// Panics if `id` was not produced by this graph.
    pub fn node(&self, id: NodeId) -> Node {
        self.inner.borrow().nodes[id.0].clone()
    }

    fn add_node(&self, op: Op, dtype: DType, shape: StaticShape) -> Symbolic {
        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.nodes.len());
        trace!(node = %id, op = op.mnemonic(), %dtype, %shape, "add node");
        inner.nodes.push(Node {
            op,
            dtype,
            shape: shape.clone(),
        });
        Symbolic {
            graph: self.clone(),
            id,
            dtype,
            shape,
        }
    }

    fn check_owned(&self, op: &'static str, inputs: &[&Symbolic]) -> Result<(), GraphError> {
        if inputs.iter().all(|s| s.graph == *self) {
            Ok(())
        } else {
            Err(GraphError::ForeignGraph(op))
        }
    }

    fn expect_dtype(op: &'static str, s: &Symbolic, expected: DType) -> Result<(), GraphError> {
        if s.dtype == expected {
            Ok(())
        } else {
            Err(GraphError::DTypeMismatch {
                op,
                expected,
                got: s.dtype,
            })
        }
    }

    /// The value of a constant node, if `s` is one.
    pub fn constant_value(&self, s: &Symbolic) -> Option<Tensor> {
        if s.graph != *self {
            return None;
        }
        match &self.node(s.id).op {
            Op::Const(t) => Some(t.clone()),
            _ => None,
        }
    }

    // ── Sources ─────────────────────────────────────────────────────────

    /// A value supplied at execution time.
    pub fn placeholder(&self, name: impl Into<String>, dtype: DType, shape: StaticShape) -> Symbolic {
        self.add_node(Op::Placeholder { name: name.into() }, dtype, shape)
    }

    pub fn constant(&self, value: Tensor) -> Symbolic {
        let dtype = value.dtype();
        let shape = StaticShape::from(value.shape());
        self.add_node(Op::Const(value), dtype, shape)
    }

    // ── Numeric ─────────────────────────────────────────────────────────

    pub fn abs(&self, x: &Symbolic) -> Result<Symbolic, GraphError> {
        self.check_owned("abs", &[x])?;
        if !x.dtype.is_numeric() {
            return Err(GraphError::InvalidArgument(format!(
                "abs is not defined for {} values",
                x.dtype
            )));
        }
        Ok(self.add_node(Op::Abs(x.id), x.dtype, x.shape.clone()))
    }

    /// Numeric cast. Strings must go through [`Graph::string_to_number`].
    pub fn cast(&self, x: &Symbolic, dtype: DType) -> Result<Symbolic, GraphError> {
        self.check_owned("cast", &[x])?;
        if x.dtype.is_string() || x.dtype == DType::Variant {
            return Err(GraphError::InvalidArgument(format!(
                "cannot cast {} to {}",
                x.dtype, dtype
            )));
        }
        if !(dtype.is_numeric() || dtype == DType::Bool) {
            return Err(GraphError::InvalidArgument(format!(
                "cast target must be numeric or bool, got {}",
                dtype
            )));
        }
        if x.dtype == dtype {
            return Ok(x.clone());
        }
        Ok(self.add_node(Op::Cast(x.id), dtype, x.shape.clone()))
    }

    pub fn string_to_number(&self, x: &Symbolic, dtype: DType) -> Result<Symbolic, GraphError> {
        self.check_owned("string_to_number", &[x])?;
        Self::expect_dtype("string_to_number", x, DType::String)?;
        if !dtype.is_numeric() {
            return Err(GraphError::InvalidArgument(format!(
                "string_to_number output must be numeric, got {}",
                dtype
            )));
        }
        Ok(self.add_node(Op::StringToNumber(x.id), dtype, x.shape.clone()))
    }

    /// Element-wise comparison `a > b`.
    pub fn greater(&self, a: &Symbolic, b: &Symbolic) -> Result<Symbolic, GraphError> {
        self.check_owned("greater", &[a, b])?;
        Self::expect_dtype("greater", b, a.dtype)?;
        let shape = binary_shape(a, b)?;
        Ok(self.add_node(Op::Greater(a.id, b.id), DType::Bool, shape))
    }

    /// Element-wise maximum; folded when both inputs are constant scalars.
    pub fn maximum(&self, a: &Symbolic, b: &Symbolic) -> Result<Symbolic, GraphError> {
        self.check_owned("maximum", &[a, b])?;
        Self::expect_dtype("maximum", b, a.dtype)?;
        if !a.dtype.is_numeric() {
            return Err(GraphError::InvalidArgument(format!(
                "maximum is not defined for {} values",
                a.dtype
            )));
        }
        if let (Some(x), Some(y)) = (self.constant_value(a), self.constant_value(b)) {
            if let (Some(l), Some(r)) = (x.to_i64(), y.to_i64()) {
                return Ok(self.constant(Tensor::scalar_int(l.max(r), a.dtype)));
            }
            if let (Some(l), Some(r)) = (x.to_f64(), y.to_f64()) {
                if a.dtype.is_float() {
                    return Ok(self.constant(Tensor::scalar_float(l.max(r), a.dtype)));
                }
            }
        }
        let shape = binary_shape(a, b)?;
        Ok(self.add_node(Op::Maximum(a.id, b.id), a.dtype, shape))
    }

    /// Half-open arithmetic sequence.
    ///
    /// When all three inputs are constants the bounds are validated here,
    /// so an inconsistent range fails at construction time.
    pub fn range(
        &self,
        start: &Symbolic,
        limit: &Symbolic,
        delta: &Symbolic,
    ) -> Result<Symbolic, GraphError> {
        self.check_owned("range", &[start, limit, delta])?;
        if !start.dtype.is_numeric() {
            return Err(GraphError::InvalidArgument(format!(
                "range is not defined for {} values",
                start.dtype
            )));
        }
        Self::expect_dtype("range", limit, start.dtype)?;
        Self::expect_dtype("range", delta, start.dtype)?;
        for s in [start, limit, delta] {
            if matches!(s.shape.rank(), Some(r) if r != 0) {
                return Err(GraphError::InvalidArgument(format!(
                    "range arguments must be scalars, got shape {}",
                    s.shape
                )));
            }
        }

        let len = match (
            self.constant_value(start),
            self.constant_value(limit),
            self.constant_value(delta),
        ) {
            (Some(s), Some(l), Some(d)) => range_len(&s, &l, &d)
                .map(|n| n.map_err(GraphError::InvalidArgument))
                .transpose()?,
            _ => None,
        };
        Ok(self.add_node(
            Op::Range {
                start: start.id,
                limit: limit.id,
                delta: delta.id,
            },
            start.dtype,
            StaticShape::known(vec![len]),
        ))
    }

    // ── Shape queries ───────────────────────────────────────────────────

    /// Dynamic shape as an `i32` vector; constant when the static shape is
    /// fully defined.
    pub fn shape(&self, x: &Symbolic) -> Result<Symbolic, GraphError> {
        self.check_owned("shape", &[x])?;
        if let Some(shape) = x.shape.to_shape() {
            let dims = shape.dims().iter().map(|&d| d as i64).collect::<Vec<_>>();
            let len = dims.len();
            return Ok(self.constant(Tensor::from_ints(dims, Shape::vector(len), DType::I32)?));
        }
        Ok(self.add_node(
            Op::Shape(x.id),
            DType::I32,
            StaticShape::known(vec![x.shape.rank()]),
        ))
    }

    /// Dynamic rank as an `i32` scalar; constant when the rank is known.
    pub fn rank(&self, x: &Symbolic) -> Result<Symbolic, GraphError> {
        self.check_owned("rank", &[x])?;
        if let Some(rank) = x.shape.rank() {
            return Ok(self.constant(Tensor::scalar_int(rank as i64, DType::I32)));
        }
        Ok(self.add_node(Op::Rank(x.id), DType::I32, StaticShape::scalar()))
    }

    /// Slice `index` along the leading dimension; folded for constants.
    pub fn index(&self, x: &Symbolic, index: usize) -> Result<Symbolic, GraphError> {
        self.check_owned("index", &[x])?;
        if x.shape.rank() == Some(0) {
            return Err(ShapeError::ScalarIndex.into());
        }
        if let Some(leading) = x.shape.dim(0) {
            if index >= leading {
                return Err(ShapeError::IndexOutOfBounds {
                    index,
                    shape: vec![leading],
                }
                .into());
            }
        }
        if let Some(t) = self.constant_value(x) {
            return Ok(self.constant(t.slice(index)?));
        }
        Ok(self.add_node(
            Op::Index { input: x.id, index },
            x.dtype,
            x.shape.inner(),
        ))
    }

    // ── Control flow ────────────────────────────────────────────────────

    pub fn cond(
        &self,
        pred: &Symbolic,
        then_branch: &Symbolic,
        else_branch: &Symbolic,
    ) -> Result<Symbolic, GraphError> {
        self.check_owned("cond", &[pred, then_branch, else_branch])?;
        Self::expect_dtype("cond", pred, DType::Bool)?;
        Self::expect_dtype("cond", else_branch, then_branch.dtype)?;
        Ok(self.add_node(
            Op::Cond {
                pred: pred.id,
                then_branch: then_branch.id,
                else_branch: else_branch.id,
            },
            then_branch.dtype,
            then_branch.shape.merge(&else_branch.shape),
        ))
    }

    /// Fails execution with the rendered `data` when `condition` is false.
    pub fn assert(&self, condition: &Symbolic, data: &[Symbolic]) -> Result<Symbolic, GraphError> {
        let mut all = vec![condition];
        all.extend(data);
        self.check_owned("assert", &all)?;
        Self::expect_dtype("assert", condition, DType::Bool)?;
        Ok(self.add_node(
            Op::Assert {
                condition: condition.id,
                data: data.iter().map(Symbolic::id).collect(),
            },
            DType::Bool,
            StaticShape::scalar(),
        ))
    }

    pub fn with_dependencies(
        &self,
        deps: &[Symbolic],
        output: &Symbolic,
    ) -> Result<Symbolic, GraphError> {
        let mut all: Vec<&Symbolic> = deps.iter().collect();
        all.push(output);
        self.check_owned("with_dependencies", &all)?;
        Ok(self.add_node(
            Op::WithDependencies {
                deps: deps.iter().map(Symbolic::id).collect(),
                output: output.id,
            },
            output.dtype,
            output.shape.clone(),
        ))
    }

    // ── Strings ─────────────────────────────────────────────────────────

    /// Concatenate scalar strings.
    pub fn string_join(&self, inputs: &[Symbolic], separator: &str) -> Result<Symbolic, GraphError> {
        let all: Vec<&Symbolic> = inputs.iter().collect();
        self.check_owned("string_join", &all)?;
        for s in inputs {
            Self::expect_dtype("string_join", s, DType::String)?;
            if matches!(s.shape.rank(), Some(r) if r != 0) {
                return Err(GraphError::InvalidArgument(format!(
                    "string_join expects scalar strings, got shape {}",
                    s.shape
                )));
            }
        }
        Ok(self.add_node(
            Op::StringJoin {
                inputs: inputs.iter().map(Symbolic::id).collect(),
                separator: separator.to_string(),
            },
            DType::String,
            StaticShape::scalar(),
        ))
    }

    pub fn as_string(&self, x: &Symbolic) -> Result<Symbolic, GraphError> {
        self.check_owned("as_string", &[x])?;
        if x.dtype == DType::Variant {
            return Err(GraphError::InvalidArgument(
                "as_string is not defined for variant values".to_string(),
            ));
        }
        Ok(self.add_node(Op::AsString(x.id), DType::String, x.shape.clone()))
    }

    // ── Containers ──────────────────────────────────────────────────────

    /// A staged list holding `elements`.
    pub fn list_from_tensors(
        &self,
        elements: &[Symbolic],
        element_dtype: DType,
    ) -> Result<Symbolic, GraphError> {
        let all: Vec<&Symbolic> = elements.iter().collect();
        self.check_owned("list_from_tensors", &all)?;
        for e in elements {
            Self::expect_dtype("list_from_tensors", e, element_dtype)?;
        }
        Ok(self.add_node(
            Op::ListFromTensors(elements.iter().map(Symbolic::id).collect()),
            DType::Variant,
            StaticShape::scalar(),
        ))
    }

    pub fn list_length(&self, list: &Symbolic) -> Result<Symbolic, GraphError> {
        self.check_owned("list_length", &[list])?;
        Self::expect_dtype("list_length", list, DType::Variant)?;
        Ok(self.add_node(Op::ListLength(list.id), DType::I32, StaticShape::scalar()))
    }

    /// A buffer of `size` zero-initialized elements.
    pub fn tensor_array(&self, element_dtype: DType, size: &Symbolic) -> Result<TensorArray, GraphError> {
        self.check_owned("tensor_array", &[size])?;
        Self::expect_dtype("tensor_array", size, DType::I32)?;
        let static_size = self
            .constant_value(size)
            .and_then(|t| t.to_i64())
            .map(|n| n.max(0) as usize);
        let handle = self.add_node(
            Op::TensorArrayNew {
                element_dtype,
                size: size.id,
            },
            DType::Variant,
            StaticShape::scalar(),
        );
        Ok(TensorArray {
            handle,
            element_dtype,
            static_size,
        })
    }

    /// A buffer holding the slices of `value` along its leading dimension.
    pub fn tensor_array_unstack(&self, value: &Symbolic) -> Result<TensorArray, GraphError> {
        self.check_owned("tensor_array_unstack", &[value])?;
        if value.shape.rank() == Some(0) {
            return Err(ShapeError::ScalarIndex.into());
        }
        let handle = self.add_node(
            Op::TensorArrayUnstack(value.id),
            DType::Variant,
            StaticShape::scalar(),
        );
        Ok(TensorArray {
            handle,
            element_dtype: value.dtype,
            static_size: value.shape.dim(0),
        })
    }

    // ── Host callbacks ──────────────────────────────────────────────────

    /// Run `callback` against the materialized `inputs` at execution time.
    ///
    /// With `use_dummy_return`, or without an `output` dtype, the node
    /// yields a scalar `i32` placeholder result so it can still be fetched
    /// or used as a dependency.
    pub fn host_callback(
        &self,
        callback: HostCallback,
        inputs: &[Symbolic],
        output: Option<DType>,
        use_dummy_return: bool,
    ) -> Result<Symbolic, GraphError> {
        let all: Vec<&Symbolic> = inputs.iter().collect();
        self.check_owned("host_callback", &all)?;
        let dummy_return = use_dummy_return || output.is_none();
        let (dtype, shape) = match output {
            Some(dtype) if !dummy_return => (dtype, StaticShape::unknown()),
            _ => (DType::I32, StaticShape::scalar()),
        };
        Ok(self.add_node(
            Op::HostCallback {
                callback,
                inputs: inputs.iter().map(Symbolic::id).collect(),
                dummy_return,
            },
            dtype,
            shape,
        ))
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        for (i, node) in inner.nodes.iter().enumerate() {
            let args = node
                .op
                .inputs()
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let detail = match &node.op {
                Op::Placeholder { name } => format!("\"{}\"", name),
                Op::Const(t) => t.to_string(),
                Op::Index { input, index } => format!("{}, {}", input, index),
                Op::HostCallback { callback, .. } => format!("{}; {}", callback.name(), args),
                _ => args,
            };
            writeln!(
                f,
                "{} = {}({}) : {} {}",
                NodeId(i),
                node.op.mnemonic(),
                detail,
                node.dtype,
                node.shape
            )?;
        }
        Ok(())
    }
}

fn binary_shape(a: &Symbolic, b: &Symbolic) -> Result<StaticShape, GraphError> {
    match (a.shape.rank(), b.shape.rank()) {
        (Some(0), _) => Ok(b.shape.clone()),
        (_, Some(0)) => Ok(a.shape.clone()),
        (Some(x), Some(y)) if x != y => Err(GraphError::InvalidArgument(format!(
            "incompatible shapes {} and {}",
            a.shape, b.shape
        ))),
        _ => Ok(a.shape.merge(&b.shape)),
    }
}

/// Element count of `range(start, limit, delta)`, validating the bounds.
///
/// Integer bounds are counted exactly; `None` when a bound is not a numeric
/// scalar.
pub(crate) fn range_len(start: &Tensor, limit: &Tensor, delta: &Tensor) -> Option<Result<usize, String>> {
    match (start.to_i64(), limit.to_i64(), delta.to_i64()) {
        (Some(s), Some(l), Some(d)) => Some(check_range(s, l, d).map(|()| {
            let (s, l, d) = (s as i128, l as i128, d as i128);
            ((l - s + d - d.signum()) / d).max(0) as usize
        })),
        _ => {
            let (s, l, d) = (start.to_f64()?, limit.to_f64()?, delta.to_f64()?);
            Some(check_range(s, l, d).map(|()| ((l - s) / d).ceil() as usize))
        }
    }
}

fn check_range<T>(start: T, limit: T, delta: T) -> Result<(), String>
where
    T: PartialOrd + Default + fmt::Display,
{
    let zero = T::default();
    if delta == zero {
        return Err("Requires delta != 0".to_string());
    }
    if delta > zero && start > limit {
        return Err(format!(
            "Requires start <= limit when delta > 0: {}/{}",
            start, limit
        ));
    }
    if delta < zero && start < limit {
        return Err(format!(
            "Requires start >= limit when delta < 0: {}/{}",
            start, limit
        ));
    }
    Ok(())
}
