use std::fmt;

/// Error type for shape-related operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// Data length does not match the shape's element count.
    ElementCount { data_len: usize, numel: usize },
    /// Index out of bounds along the leading dimension.
    IndexOutOfBounds { index: usize, shape: Vec<usize> },
    /// A scalar was indexed.
    ScalarIndex,
    /// Shapes that must agree do not.
    Mismatch {
        shape_a: Vec<usize>,
        shape_b: Vec<usize>,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::ElementCount { data_len, numel } => {
                write!(
                    f,
                    "data has {} elements but the shape holds {}",
                    data_len, numel
                )
            }
            ShapeError::IndexOutOfBounds { index, shape } => {
                write!(
                    f,
                    "index {} is out of bounds for shape {:?}",
                    index, shape
                )
            }
            ShapeError::ScalarIndex => write!(f, "cannot index into a scalar"),
            ShapeError::Mismatch { shape_a, shape_b } => {
                write!(f, "shapes {:?} and {:?} are incompatible", shape_a, shape_b)
            }
        }
    }
}

impl std::error::Error for ShapeError {}

/// Concrete dimensionality of a materialized tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Create a scalar shape (0 dimensions).
    pub fn scalar() -> Self {
        Shape { dims: vec![] }
    }

    /// Create a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Shape { dims: vec![len] }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        if self.dims.is_empty() {
            1 // scalar
        } else {
            self.dims.iter().product()
        }
    }

    /// Returns the dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// True if this is a scalar (0-dimensional).
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Size of the leading dimension, `None` for scalars.
    pub fn leading(&self) -> Option<usize> {
        self.dims.first().copied()
    }

    /// Shape of one slice along the leading dimension.
    pub fn inner(&self) -> Shape {
        Shape::new(self.dims.iter().skip(1).copied().collect())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        if self.dims.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

/// Construction-time shape knowledge of a staged value.
///
/// The rank may be unknown; when it is known each dimension may still be
/// unknown (`None`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaticShape {
    dims: Option<Vec<Option<usize>>>,
}

impl StaticShape {
    /// Nothing is known, not even the rank.
    pub fn unknown() -> Self {
        StaticShape { dims: None }
    }

    /// Known rank with per-dimension optional sizes.
    pub fn known(dims: Vec<Option<usize>>) -> Self {
        StaticShape { dims: Some(dims) }
    }

    /// Known rank, every dimension unknown.
    pub fn with_rank(rank: usize) -> Self {
        StaticShape {
            dims: Some(vec![None; rank]),
        }
    }

    pub fn scalar() -> Self {
        StaticShape { dims: Some(vec![]) }
    }

    pub fn rank(&self) -> Option<usize> {
        self.dims.as_ref().map(Vec::len)
    }

    /// Static size of dimension `axis`; `None` when the rank or the size is
    /// unknown, or the axis does not exist.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.as_ref().and_then(|d| d.get(axis).copied().flatten())
    }

    pub fn dims(&self) -> Option<&[Option<usize>]> {
        self.dims.as_deref()
    }

    /// Returns the concrete shape when every dimension is known.
    pub fn to_shape(&self) -> Option<Shape> {
        let dims = self.dims.as_ref()?;
        dims.iter()
            .copied()
            .collect::<Option<Vec<usize>>>()
            .map(Shape::new)
    }

    pub fn is_fully_defined(&self) -> bool {
        self.to_shape().is_some()
    }

    /// Static shape after dropping the leading dimension.
    pub fn inner(&self) -> StaticShape {
        match &self.dims {
            Some(d) if !d.is_empty() => StaticShape::known(d[1..].to_vec()),
            _ => StaticShape::unknown(),
        }
    }

    /// Most specific shape compatible with both inputs.
    pub fn merge(&self, other: &StaticShape) -> StaticShape {
        match (&self.dims, &other.dims) {
            (Some(a), Some(b)) if a.len() == b.len() => StaticShape::known(
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| if x == y { *x } else { None })
                    .collect(),
            ),
            _ => StaticShape::unknown(),
        }
    }

    /// True if a concrete shape satisfies this static description.
    pub fn accepts(&self, shape: &Shape) -> bool {
        match &self.dims {
            None => true,
            Some(d) => {
                d.len() == shape.ndim()
                    && d.iter()
                        .zip(shape.dims())
                        .all(|(s, c)| s.map_or(true, |s| s == *c))
            }
        }
    }
}

impl From<&Shape> for StaticShape {
    fn from(shape: &Shape) -> Self {
        StaticShape::known(shape.dims().iter().map(|&d| Some(d)).collect())
    }
}

impl fmt::Display for StaticShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dims {
            None => write!(f, "<unknown>"),
            Some(dims) => {
                write!(f, "(")?;
                for (i, d) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match d {
                        Some(d) => write!(f, "{}", d)?,
                        None => write!(f, "?")?,
                    }
                }
                if dims.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
        }
    }
}
