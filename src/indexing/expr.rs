use smallvec::SmallVec;

use crate::shape::{element_count, Shape};

/// A Python-flavored slice with open bounds and optional (possibly negative)
/// step. Raw input only; the classifier turns it into a canonical
/// [`CSlice`](crate::indexing::CSlice) once the axis length is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    /// The full slice `[:]`.
    pub fn full() -> Slice {
        Slice::default()
    }

    /// `[start:stop]`.
    pub fn range(start: i64, stop: i64) -> Slice {
        Slice {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    /// `[start:]`.
    pub fn starting_at(start: i64) -> Slice {
        Slice {
            start: Some(start),
            ..Slice::default()
        }
    }

    /// `[:stop]`.
    pub fn up_to(stop: i64) -> Slice {
        Slice {
            stop: Some(stop),
            ..Slice::default()
        }
    }

    /// `[start:stop:step]`.
    pub fn stepped(start: Option<i64>, stop: Option<i64>, step: i64) -> Slice {
        Slice {
            start,
            stop,
            step: Some(step),
        }
    }
}

/// A row-major n-dimensional integer index array.
///
/// Zero-rank arrays (empty shape, one value) act as broadcastable scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexArray {
    shape: Shape,
    data: Vec<i64>,
}

impl IndexArray {
    /// Build from a shape and matching row-major values.
    ///
    /// Panics if the value count does not match the shape; raw arrays are
    /// built by callers from data they already sized.
    pub fn new(shape: impl Into<Shape>, data: Vec<i64>) -> IndexArray {
        let shape = shape.into();
        assert_eq!(
            element_count(&shape) as usize,
            data.len(),
            "index array data must match its shape"
        );
        IndexArray { shape, data }
    }

    pub fn scalar(value: i64) -> IndexArray {
        IndexArray {
            shape: SmallVec::new(),
            data: vec![value],
        }
    }

    pub fn from_vec(data: Vec<i64>) -> IndexArray {
        let mut shape: Shape = SmallVec::new();
        shape.push(data.len() as u64);
        IndexArray { shape, data }
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn values(&self) -> &[i64] {
        &self.data
    }

    /// Elementwise map preserving shape.
    pub(crate) fn map(&self, f: impl Fn(i64) -> i64) -> IndexArray {
        IndexArray {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Re-shape in place (same element count); used when padding arrays to a
    /// common broadcast rank.
    pub(crate) fn reshaped(&self, shape: Shape) -> IndexArray {
        debug_assert_eq!(element_count(&shape), element_count(&self.shape));
        IndexArray {
            shape,
            data: self.data.clone(),
        }
    }

    /// Value at a multi-index of the same rank, with size-1 axes broadcast.
    pub(crate) fn get_broadcast(&self, index: &[u64]) -> i64 {
        debug_assert_eq!(index.len(), self.shape.len());
        let mut flat = 0u64;
        let mut stride = 1u64;
        for axis in (0..self.shape.len()).rev() {
            let dim = self.shape[axis];
            let i = if dim == 1 { 0 } else { index[axis] };
            flat += i * stride;
            stride *= dim;
        }
        self.data[flat as usize]
    }
}

/// One term of a raw indexing expression.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexElem {
    /// A single (possibly negative) integer; drops the axis.
    Index(i64),
    /// A slice; keeps the axis.
    Slice(Slice),
    /// Expands to full slices over the unnamed middle axes.
    Ellipsis,
    /// A 1-D integer array applied to this axis independently.
    IntArray(Vec<i64>),
    /// A boolean mask over this axis; must match the axis length.
    BoolArray(Vec<bool>),
    /// An n-D integer array broadcast jointly with other array terms.
    NdArray(IndexArray),
}

impl From<i64> for IndexElem {
    fn from(v: i64) -> IndexElem {
        IndexElem::Index(v)
    }
}

impl From<Slice> for IndexElem {
    fn from(v: Slice) -> IndexElem {
        IndexElem::Slice(v)
    }
}

/// A raw indexing expression: what a caller writes before classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexExpr(SmallVec<[IndexElem; 4]>);

impl IndexExpr {
    /// The empty expression `[]` (selects everything; on a zero-rank array,
    /// the scalar).
    pub fn empty() -> IndexExpr {
        IndexExpr::default()
    }

    pub fn terms(&self) -> &[IndexElem] {
        &self.0
    }

    pub fn push(mut self, elem: impl Into<IndexElem>) -> IndexExpr {
        self.0.push(elem.into());
        self
    }

    pub fn index(self, i: i64) -> IndexExpr {
        self.push(IndexElem::Index(i))
    }

    pub fn slice(self, s: Slice) -> IndexExpr {
        self.push(IndexElem::Slice(s))
    }

    pub fn full(self) -> IndexExpr {
        self.push(IndexElem::Slice(Slice::full()))
    }

    pub fn ellipsis(self) -> IndexExpr {
        self.push(IndexElem::Ellipsis)
    }

    pub fn int_array(self, values: impl Into<Vec<i64>>) -> IndexExpr {
        self.push(IndexElem::IntArray(values.into()))
    }

    pub fn bool_array(self, mask: impl Into<Vec<bool>>) -> IndexExpr {
        self.push(IndexElem::BoolArray(mask.into()))
    }

    pub fn nd_array(self, array: IndexArray) -> IndexExpr {
        self.push(IndexElem::NdArray(array))
    }
}

impl FromIterator<IndexElem> for IndexExpr {
    fn from_iter<I: IntoIterator<Item = IndexElem>>(iter: I) -> IndexExpr {
        IndexExpr(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chains() {
        let e = IndexExpr::empty().index(1).full().ellipsis();
        assert_eq!(e.terms().len(), 3);
        assert!(matches!(e.terms()[2], IndexElem::Ellipsis));
    }

    #[test]
    fn broadcast_get_stretches_unit_axes() {
        let a = IndexArray::new([2u64, 1u64].as_slice(), vec![5, 9]);
        assert_eq!(a.get_broadcast(&[1, 3]), 9);
        assert_eq!(a.get_broadcast(&[0, 0]), 5);
    }

    #[test]
    fn scalar_array_has_zero_rank() {
        let a = IndexArray::scalar(3);
        assert_eq!(a.ndim(), 0);
        assert_eq!(a.get_broadcast(&[]), 3);
    }
}
