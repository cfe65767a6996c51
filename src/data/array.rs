use smallvec::SmallVec;

use crate::data::{DataBuffer, DataType, Scalar};
use crate::errors::{BackendError, BackendResult};
use crate::shape::{element_count, strides_row_major, Shape};

/// A plain in-memory array: row-major buffer plus shape.
///
/// Every materialization of a lazy selection produces one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    shape: Shape,
    buffer: DataBuffer,
}

impl ArrayData {
    /// Build an array from a shape and a matching row-major buffer.
    ///
    /// Panics if the buffer length does not match the shape's element count;
    /// backends construct these only from reads they have already sized.
    pub fn new(shape: impl Into<Shape>, buffer: DataBuffer) -> ArrayData {
        let shape = shape.into();
        assert_eq!(
            element_count(&shape) as usize,
            buffer.len(),
            "buffer length must match shape"
        );
        ArrayData { shape, buffer }
    }

    /// A zero-rank array holding one value.
    pub fn from_scalar(value: Scalar) -> ArrayData {
        ArrayData {
            shape: SmallVec::new(),
            buffer: DataBuffer::from(value),
        }
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.buffer.dtype()
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn element_count(&self) -> u64 {
        element_count(&self.shape)
    }

    pub fn buffer(&self) -> &DataBuffer {
        &self.buffer
    }

    /// The element at a multi-index.
    pub fn get(&self, index: &[u64]) -> Scalar {
        let strides = strides_row_major(&self.shape);
        let flat: u64 = index
            .iter()
            .zip(strides.iter())
            .map(|(i, s)| i * s)
            .sum();
        self.buffer.scalar_at(flat as usize)
    }

    /// Extract the single value of a zero-rank array.
    ///
    /// Selections that still carry axes are not scalars, even when they hold
    /// exactly one element.
    pub fn into_scalar(self) -> BackendResult<Scalar> {
        if !self.shape.is_empty() {
            return Err(BackendError::NotAScalar {
                shape: self.shape.to_vec(),
            });
        }
        Ok(self.buffer.scalar_at(0))
    }
}
