//! In-memory deferred sequence source.

use std::rc::Rc;

use crate::dtype::DType;
use crate::shape::ShapeError;
use crate::tensor::Tensor;

/// A sequence of elements, each a tuple of tensor components.
///
/// Transformations such as [`Dataset::enumerate`] return new datasets and
/// leave the source untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    elements: Rc<Vec<Vec<Tensor>>>,
}

impl Dataset {
    pub fn from_elements(elements: Vec<Vec<Tensor>>) -> Self {
        Dataset {
            elements: Rc::new(elements),
        }
    }

    /// One single-component element per slice along the leading dimension.
    pub fn from_tensor_slices(value: &Tensor) -> Result<Self, ShapeError> {
        let slices = value.unstack()?;
        Ok(Dataset::from_elements(
            slices.into_iter().map(|t| vec![t]).collect(),
        ))
    }

    /// `0..n` as `i64` scalars.
    pub fn range(n: i64) -> Self {
        Dataset::from_elements(
            (0..n.max(0))
                .map(|i| vec![Tensor::scalar_int(i, DType::I64)])
                .collect(),
        )
    }

    /// Number of elements.
    pub fn cardinality(&self) -> usize {
        self.elements.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Tensor]> {
        self.elements.iter().map(Vec::as_slice)
    }

    /// Prefix every element with its `i64` position, counting from `start`.
    pub fn enumerate(&self, start: i64) -> Dataset {
        let elements = self
            .elements
            .iter()
            .zip(start..)
            .map(|(components, i)| {
                let mut out = Vec::with_capacity(components.len() + 1);
                out.push(Tensor::scalar_int(i, DType::I64));
                out.extend(components.iter().cloned());
                out
            })
            .collect();
        Dataset::from_elements(elements)
    }
}
