use serde::{Deserialize, Serialize};

/// Element kinds carried by staged and concrete tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
    Bool,
    /// Byte strings.
    String,
    /// Opaque containers (tensor lists, tensor arrays).
    Variant,
}

impl DType {
    /// Returns the size in bytes of a single element, when fixed.
    pub fn size_bytes(&self) -> Option<usize> {
        match self {
            DType::F32 | DType::I32 => Some(4),
            DType::F64 | DType::I64 => Some(8),
            DType::Bool => Some(1),
            DType::String | DType::Variant => None,
        }
    }

    /// Returns true if this dtype is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Returns true if this dtype is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(self, DType::I32 | DType::I64)
    }

    /// Returns true for int and float dtypes.
    pub fn is_numeric(&self) -> bool {
        self.is_float() || self.is_integer()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DType::String)
    }

    /// Parse the short names used by `Display` (`f32`, `i64`, `string`, ...).
    pub fn from_name(name: &str) -> Option<DType> {
        match name {
            "f32" => Some(DType::F32),
            "f64" => Some(DType::F64),
            "i32" => Some(DType::I32),
            "i64" => Some(DType::I64),
            "bool" => Some(DType::Bool),
            "string" | "str" => Some(DType::String),
            "variant" => Some(DType::Variant),
            _ => None,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
            DType::I32 => write!(f, "i32"),
            DType::I64 => write!(f, "i64"),
            DType::Bool => write!(f, "bool"),
            DType::String => write!(f, "string"),
            DType::Variant => write!(f, "variant"),
        }
    }
}
