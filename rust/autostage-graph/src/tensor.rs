use crate::dtype::DType;
use crate::shape::{Shape, ShapeError};

/// Flat row-major element storage.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// `F32` and `F64` elements; `F32` values are kept rounded to f32.
    Float(Vec<f64>),
    /// `I32` and `I64` elements.
    Int(Vec<i64>),
    Bool(Vec<bool>),
    Bytes(Vec<Vec<u8>>),
    /// A single variant element holding a list of tensors.
    List(Vec<Tensor>),
}

impl TensorData {
    fn len(&self) -> usize {
        match self {
            TensorData::Float(v) => v.len(),
            TensorData::Int(v) => v.len(),
            TensorData::Bool(v) => v.len(),
            TensorData::Bytes(v) => v.len(),
            TensorData::List(_) => 1,
        }
    }
}

/// A materialized multi-dimensional array, as produced by `Session::run`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: TensorData,
    shape: Shape,
    dtype: DType,
}

impl Tensor {
    // ── Constructors ────────────────────────────────────────────────────

    /// Create a float tensor; `dtype` must be `F32` or `F64`.
    pub fn from_floats(data: Vec<f64>, shape: Shape, dtype: DType) -> Result<Self, ShapeError> {
        debug_assert!(dtype.is_float());
        let data = if dtype == DType::F32 {
            data.into_iter().map(|x| x as f32 as f64).collect()
        } else {
            data
        };
        Self::checked(TensorData::Float(data), shape, dtype)
    }

    /// Create an integer tensor; `dtype` must be `I32` or `I64`.
    pub fn from_ints(data: Vec<i64>, shape: Shape, dtype: DType) -> Result<Self, ShapeError> {
        debug_assert!(dtype.is_integer());
        let data = if dtype == DType::I32 {
            data.into_iter().map(|x| x as i32 as i64).collect()
        } else {
            data
        };
        Self::checked(TensorData::Int(data), shape, dtype)
    }

    pub fn from_bools(data: Vec<bool>, shape: Shape) -> Result<Self, ShapeError> {
        Self::checked(TensorData::Bool(data), shape, DType::Bool)
    }

    pub fn from_strings(data: Vec<Vec<u8>>, shape: Shape) -> Result<Self, ShapeError> {
        Self::checked(TensorData::Bytes(data), shape, DType::String)
    }

    /// A scalar variant tensor holding a list of element tensors.
    pub fn list(elements: Vec<Tensor>) -> Self {
        Tensor {
            data: TensorData::List(elements),
            shape: Shape::scalar(),
            dtype: DType::Variant,
        }
    }

    pub fn scalar_float(value: f64, dtype: DType) -> Self {
        let value = if dtype == DType::F32 {
            value as f32 as f64
        } else {
            value
        };
        Tensor {
            data: TensorData::Float(vec![value]),
            shape: Shape::scalar(),
            dtype,
        }
    }

    pub fn scalar_int(value: i64, dtype: DType) -> Self {
        let value = if dtype == DType::I32 {
            value as i32 as i64
        } else {
            value
        };
        Tensor {
            data: TensorData::Int(vec![value]),
            shape: Shape::scalar(),
            dtype,
        }
    }

    pub fn scalar_bool(value: bool) -> Self {
        Tensor {
            data: TensorData::Bool(vec![value]),
            shape: Shape::scalar(),
            dtype: DType::Bool,
        }
    }

    pub fn scalar_string(value: impl Into<Vec<u8>>) -> Self {
        Tensor {
            data: TensorData::Bytes(vec![value.into()]),
            shape: Shape::scalar(),
            dtype: DType::String,
        }
    }

    fn checked(data: TensorData, shape: Shape, dtype: DType) -> Result<Self, ShapeError> {
        if data.len() != shape.numel() {
            return Err(ShapeError::ElementCount {
                data_len: data.len(),
                numel: shape.numel(),
            });
        }
        Ok(Tensor { data, shape, dtype })
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// Returns the shape of this tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Returns the data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the flat storage.
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Elements of a variant list tensor.
    pub fn as_list(&self) -> Option<&[Tensor]> {
        match &self.data {
            TensorData::List(items) => Some(items),
            _ => None,
        }
    }

    /// The single value of a one-element integer tensor.
    pub fn to_i64(&self) -> Option<i64> {
        match &self.data {
            TensorData::Int(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// The single value of a one-element numeric tensor, widened to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match &self.data {
            TensorData::Float(v) if v.len() == 1 => Some(v[0]),
            TensorData::Int(v) if v.len() == 1 => Some(v[0] as f64),
            _ => None,
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match &self.data {
            TensorData::Bool(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    // ── Slicing ─────────────────────────────────────────────────────────

    /// Slice `index` along the leading dimension.
    pub fn slice(&self, index: usize) -> Result<Tensor, ShapeError> {
        let leading = self.shape.leading().ok_or(ShapeError::ScalarIndex)?;
        if index >= leading {
            return Err(ShapeError::IndexOutOfBounds {
                index,
                shape: self.shape.dims().to_vec(),
            });
        }
        let inner = self.shape.inner();
        let width = inner.numel();
        let range = index * width..(index + 1) * width;
        let data = match &self.data {
            TensorData::Float(v) => TensorData::Float(v[range].to_vec()),
            TensorData::Int(v) => TensorData::Int(v[range].to_vec()),
            TensorData::Bool(v) => TensorData::Bool(v[range].to_vec()),
            TensorData::Bytes(v) => TensorData::Bytes(v[range].to_vec()),
            TensorData::List(_) => return Err(ShapeError::ScalarIndex),
        };
        Ok(Tensor {
            data,
            shape: inner,
            dtype: self.dtype,
        })
    }

    /// Split along the leading dimension.
    pub fn unstack(&self) -> Result<Vec<Tensor>, ShapeError> {
        let leading = self.shape.leading().ok_or(ShapeError::ScalarIndex)?;
        (0..leading).map(|i| self.slice(i)).collect()
    }

    /// Render every element as text, row-major.
    pub fn element_strings(&self) -> Vec<String> {
        match &self.data {
            TensorData::Float(v) => v.iter().map(|x| format_float(*x)).collect(),
            TensorData::Int(v) => v.iter().map(|x| x.to_string()).collect(),
            TensorData::Bool(v) => v.iter().map(|x| x.to_string()).collect(),
            TensorData::Bytes(v) => v
                .iter()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .collect(),
            TensorData::List(items) => vec![format!("<list of {}>", items.len())],
        }
    }
}

fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else {
        x.to_string()
    }
}

impl std::fmt::Display for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items = self.element_strings();
        if self.shape.is_scalar() {
            write!(f, "{}", items.join(""))
        } else {
            write!(f, "[{}]", items.join(" "))
        }
    }
}
