use std::fmt;

use smallvec::SmallVec;

use crate::errors::index::BroadcastMismatchSnafu;
use crate::errors::IndexResult;
use crate::indexing::expr::IndexArray;
use crate::shape::{broadcast_shapes, padded_dim, Shape};

/// The three canonical indexer kinds a backend can be asked to service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Integers, slices, ellipsis only; stride-based access.
    Basic,
    /// Per-axis index arrays applied independently (Cartesian product).
    Outer,
    /// Index arrays broadcast together to pick joint coordinates.
    Vectorized,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexKind::Basic => "basic",
            IndexKind::Outer => "outer",
            IndexKind::Vectorized => "vectorized",
        };
        write!(f, "{}", name)
    }
}

/// A canonical slice: the arithmetic progression
/// `start, start + step, ...` of `len` indices.
///
/// Always normalized against the axis it was classified for, so every
/// produced index is in bounds. `step` may be negative; for `len == 0` the
/// start is meaningless and set to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CSlice {
    pub start: i64,
    pub step: i64,
    pub len: u64,
}

impl CSlice {
    /// The identity slice over an axis of length `len`.
    pub fn full(len: u64) -> CSlice {
        CSlice { start: 0, step: 1, len }
    }

    /// The index at position `i` of the progression (`i < len`).
    #[inline]
    pub fn nth(&self, i: u64) -> u64 {
        (self.start + i as i64 * self.step) as u64
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).map(|i| self.nth(i))
    }

    pub fn is_identity_for(&self, axis_len: u64) -> bool {
        self.start == 0 && self.step == 1 && self.len == axis_len
    }
}

impl fmt::Display for CSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:+{}x{}", self.start, self.step, self.len)
    }
}

/// One axis of a basic indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasicTerm {
    /// Select one position; the axis is dropped from the result.
    Index(u64),
    /// Select a progression; the axis is kept.
    Slice(CSlice),
}

/// One axis of an outer (orthogonal) indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OuterTerm {
    Index(u64),
    Slice(CSlice),
    /// Explicit per-axis positions; the axis is kept with the array's length.
    Array(Vec<u64>),
}

impl From<BasicTerm> for OuterTerm {
    fn from(t: BasicTerm) -> OuterTerm {
        match t {
            BasicTerm::Index(i) => OuterTerm::Index(i),
            BasicTerm::Slice(s) => OuterTerm::Slice(s),
        }
    }
}

/// A joint (fancy) indexer: one integer array per target axis, all padded to
/// a common rank and broadcast-compatible, values already normalized
/// non-negative and in bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorizedIndexer {
    arrays: SmallVec<[IndexArray; 4]>,
    shape: Shape,
}

impl VectorizedIndexer {
    /// Build from per-axis arrays, padding every array to the common
    /// broadcast rank. Fails if any pair of shapes cannot broadcast.
    pub fn new(arrays: impl IntoIterator<Item = IndexArray>) -> IndexResult<VectorizedIndexer> {
        let arrays: SmallVec<[IndexArray; 4]> = arrays.into_iter().collect();
        let mut shape: Shape = SmallVec::new();
        for (axis, a) in arrays.iter().enumerate() {
            shape = match broadcast_shapes(&shape, a.shape()) {
                Some(s) => s,
                None => {
                    return BroadcastMismatchSnafu {
                        shape: a.shape().to_vec(),
                        axis,
                        against: shape.to_vec(),
                    }
                    .fail()
                }
            };
        }
        let rank = shape.len();
        let padded = arrays
            .into_iter()
            .map(|a| {
                let mut s: Shape = SmallVec::with_capacity(rank);
                for i in 0..rank {
                    s.push(padded_dim(a.shape(), i, rank));
                }
                a.reshaped(s)
            })
            .collect();
        Ok(VectorizedIndexer { arrays: padded, shape })
    }

    /// Internal constructor for arrays already padded to `shape`'s rank.
    pub(crate) fn from_padded(
        arrays: SmallVec<[IndexArray; 4]>,
        shape: Shape,
    ) -> VectorizedIndexer {
        debug_assert!(arrays.iter().all(|a| a.ndim() == shape.len()));
        VectorizedIndexer { arrays, shape }
    }

    /// One array per target axis.
    pub fn arrays(&self) -> &[IndexArray] {
        &self.arrays
    }

    /// The broadcast result shape.
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.arrays.len()
    }
}

/// A classified indexing request: exactly one of the three canonical kinds.
///
/// Term count always equals the rank of the array the indexer was classified
/// against; no raw expression ever reaches a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Indexer {
    Basic(SmallVec<[BasicTerm; 4]>),
    Outer(SmallVec<[OuterTerm; 4]>),
    Vectorized(VectorizedIndexer),
}

impl Indexer {
    /// The identity indexer for an array of the given shape.
    pub fn full(shape: &[u64]) -> Indexer {
        Indexer::Basic(shape.iter().map(|&n| BasicTerm::Slice(CSlice::full(n))).collect())
    }

    /// Smart outer constructor: a key whose arrays have all collapsed is
    /// plain basic indexing, and is demoted so backends see the cheaper kind.
    pub fn outer(terms: SmallVec<[OuterTerm; 4]>) -> Indexer {
        let has_array = terms.iter().any(|t| matches!(t, OuterTerm::Array(_)));
        if has_array {
            Indexer::Outer(terms)
        } else {
            Indexer::Basic(
                terms
                    .into_iter()
                    .map(|t| match t {
                        OuterTerm::Index(i) => BasicTerm::Index(i),
                        OuterTerm::Slice(s) => BasicTerm::Slice(s),
                        OuterTerm::Array(_) => unreachable!(),
                    })
                    .collect(),
            )
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            Indexer::Basic(_) => IndexKind::Basic,
            Indexer::Outer(_) => IndexKind::Outer,
            Indexer::Vectorized(_) => IndexKind::Vectorized,
        }
    }

    /// Number of target-array axes this indexer consumes.
    pub fn rank(&self) -> usize {
        match self {
            Indexer::Basic(t) => t.len(),
            Indexer::Outer(t) => t.len(),
            Indexer::Vectorized(v) => v.rank(),
        }
    }

    /// Which target axes survive into the result, per term.
    ///
    /// `None` for joint selections: a vectorized key replaces the indexed
    /// axes with the broadcast shape instead of keeping any of them.
    pub fn kept_axes(&self) -> Option<SmallVec<[bool; 4]>> {
        match self {
            Indexer::Basic(terms) => Some(
                terms
                    .iter()
                    .map(|t| !matches!(t, BasicTerm::Index(_)))
                    .collect(),
            ),
            Indexer::Outer(terms) => Some(
                terms
                    .iter()
                    .map(|t| !matches!(t, OuterTerm::Index(_)))
                    .collect(),
            ),
            Indexer::Vectorized(_) => None,
        }
    }

    /// Shape of the selection this indexer produces.
    pub fn result_shape(&self) -> Shape {
        match self {
            Indexer::Basic(terms) => terms
                .iter()
                .filter_map(|t| match t {
                    BasicTerm::Index(_) => None,
                    BasicTerm::Slice(s) => Some(s.len),
                })
                .collect(),
            Indexer::Outer(terms) => terms
                .iter()
                .filter_map(|t| match t {
                    OuterTerm::Index(_) => None,
                    OuterTerm::Slice(s) => Some(s.len),
                    OuterTerm::Array(a) => Some(a.len() as u64),
                })
                .collect(),
            Indexer::Vectorized(v) => v.shape.clone(),
        }
    }
}

impl fmt::Display for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indexer::Basic(terms) => {
                write!(f, "Basic[")?;
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match t {
                        BasicTerm::Index(v) => write!(f, "{}", v)?,
                        BasicTerm::Slice(s) => write!(f, "{}", s)?,
                    }
                }
                write!(f, "]")
            }
            Indexer::Outer(terms) => {
                write!(f, "Outer[")?;
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match t {
                        OuterTerm::Index(v) => write!(f, "{}", v)?,
                        OuterTerm::Slice(s) => write!(f, "{}", s)?,
                        OuterTerm::Array(a) => write!(f, "{:?}", a)?,
                    }
                }
                write!(f, "]")
            }
            Indexer::Vectorized(v) => {
                write!(f, "Vectorized[")?;
                for (i, a) in v.arrays().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "array{:?}", a.shape())?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn full_is_identity_shape() {
        let ix = Indexer::full(&[3, 4]);
        assert_eq!(ix.kind(), IndexKind::Basic);
        assert_eq!(ix.result_shape().as_slice(), &[3, 4]);
    }

    #[test]
    fn basic_drops_integer_axes() {
        let ix = Indexer::Basic(smallvec![
            BasicTerm::Index(1),
            BasicTerm::Slice(CSlice { start: 1, step: 2, len: 3 }),
        ]);
        assert_eq!(ix.result_shape().as_slice(), &[3]);
    }

    #[test]
    fn outer_without_arrays_demotes_to_basic() {
        let ix = Indexer::outer(smallvec![
            OuterTerm::Index(0),
            OuterTerm::Slice(CSlice::full(5)),
        ]);
        assert_eq!(ix.kind(), IndexKind::Basic);
    }

    #[test]
    fn outer_result_is_cartesian() {
        let ix = Indexer::outer(smallvec![
            OuterTerm::Array(vec![0, 2]),
            OuterTerm::Array(vec![1, 2, 3]),
        ]);
        assert_eq!(ix.result_shape().as_slice(), &[2, 3]);
    }

    #[test]
    fn vectorized_broadcasts_to_joint_shape() {
        let v = VectorizedIndexer::new([
            IndexArray::new([2u64, 1u64].as_slice(), vec![0, 1]),
            IndexArray::from_vec(vec![0, 1, 2]),
        ])
        .unwrap();
        assert_eq!(v.shape(), &[2, 3]);
        let ix = Indexer::Vectorized(v);
        assert_eq!(ix.result_shape().as_slice(), &[2, 3]);
    }

    #[test]
    fn vectorized_rejects_incompatible_shapes() {
        let err = VectorizedIndexer::new([
            IndexArray::from_vec(vec![0, 1]),
            IndexArray::from_vec(vec![0, 1, 2]),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn display_names_the_indexer() {
        let ix = Indexer::outer(smallvec![OuterTerm::Array(vec![0, 2, 3])]);
        assert_eq!(format!("{}", ix), "Outer[[0, 2, 3]]");
    }

    #[test]
    fn negative_step_slice_iterates_downward() {
        let s = CSlice { start: 4, step: -2, len: 3 };
        let got: Vec<u64> = s.iter().collect();
        assert_eq!(got, vec![4, 2, 0]);
    }
}
