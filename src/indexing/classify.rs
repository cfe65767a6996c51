//! Classification of raw indexing expressions into canonical indexers.
//!
//! This is the only place raw expressions are interpreted: ellipsis is
//! expanded, negative indices and open slice bounds are resolved against the
//! target shape, boolean masks are lowered to position arrays, and exactly
//! one [`Indexer`] kind is chosen.

use smallvec::SmallVec;

use crate::errors::index::{
    MaskLengthMismatchSnafu, MultipleEllipsisSnafu, OutOfBoundsSnafu, TooManyTermsSnafu,
    ZeroStepSnafu,
};
use crate::errors::IndexResult;
use crate::indexing::expr::{IndexArray, IndexElem, IndexExpr, Slice};
use crate::indexing::indexer::{CSlice, Indexer, OuterTerm, VectorizedIndexer};
use crate::shape::{broadcast_shapes, padded_dim, Shape};

/// Classify `expr` against an array of the given shape.
///
/// The produced indexer consumes every axis: an ellipsis (at most one)
/// expands to full slices over the unnamed middle axes, and missing trailing
/// axes are padded with full slices.
pub fn classify(expr: &IndexExpr, shape: &[u64]) -> IndexResult<Indexer> {
    let rank = shape.len();
    let terms = expr.terms();

    let ellipses = terms
        .iter()
        .filter(|t| matches!(t, IndexElem::Ellipsis))
        .count();
    if ellipses > 1 {
        return MultipleEllipsisSnafu.fail();
    }
    let concrete = terms.len() - ellipses;
    if concrete > rank {
        return TooManyTermsSnafu { provided: concrete, rank }.fail();
    }

    let fill = rank - concrete;
    let mut expanded: SmallVec<[IndexElem; 4]> = SmallVec::with_capacity(rank);
    for t in terms {
        match t {
            IndexElem::Ellipsis => {
                for _ in 0..fill {
                    expanded.push(IndexElem::Slice(Slice::full()));
                }
            }
            other => expanded.push(other.clone()),
        }
    }
    if ellipses == 0 {
        for _ in 0..fill {
            expanded.push(IndexElem::Slice(Slice::full()));
        }
    }

    // Any n-D array means the arrays are meant jointly; otherwise per-axis
    // terms (including 1-D arrays and masks) are independent.
    if expanded.iter().any(|t| matches!(t, IndexElem::NdArray(_))) {
        return classify_vectorized(&expanded, shape);
    }

    let mut out: SmallVec<[OuterTerm; 4]> = SmallVec::with_capacity(rank);
    for (axis, term) in expanded.iter().enumerate() {
        let len = shape[axis];
        let t = match term {
            IndexElem::Index(i) => OuterTerm::Index(normalize_index(*i, axis, len)?),
            IndexElem::Slice(s) => OuterTerm::Slice(normalize_slice(s, axis, len)?),
            IndexElem::IntArray(values) => {
                OuterTerm::Array(normalize_positions(values, axis, len)?)
            }
            IndexElem::BoolArray(mask) => OuterTerm::Array(mask_positions(mask, axis, len)?),
            IndexElem::Ellipsis | IndexElem::NdArray(_) => unreachable!(),
        };
        out.push(t);
    }

    // The smart constructor demotes array-free keys to basic.
    Ok(Indexer::outer(out))
}

/// Joint classification: every axis becomes an integer array padded to a
/// common rank. Integers become 0-d constants, slices become aranges on
/// fresh trailing axes, and 1-D/n-D arrays broadcast together.
fn classify_vectorized(expanded: &[IndexElem], shape: &[u64]) -> IndexResult<Indexer> {
    enum Slot {
        Core(IndexArray),
        Progression(CSlice),
    }

    let mut slots: SmallVec<[Slot; 4]> = SmallVec::with_capacity(expanded.len());
    for (axis, term) in expanded.iter().enumerate() {
        let len = shape[axis];
        let slot = match term {
            IndexElem::Index(i) => {
                Slot::Core(IndexArray::scalar(normalize_index(*i, axis, len)? as i64))
            }
            IndexElem::IntArray(values) => Slot::Core(IndexArray::from_vec(
                normalize_positions(values, axis, len)?
                    .into_iter()
                    .map(|v| v as i64)
                    .collect(),
            )),
            IndexElem::BoolArray(mask) => Slot::Core(IndexArray::from_vec(
                mask_positions(mask, axis, len)?
                    .into_iter()
                    .map(|v| v as i64)
                    .collect(),
            )),
            IndexElem::NdArray(a) => {
                Slot::Core(normalize_array(a, axis, len)?)
            }
            IndexElem::Slice(s) => Slot::Progression(normalize_slice(s, axis, len)?),
            IndexElem::Ellipsis => unreachable!(),
        };
        slots.push(slot);
    }

    // Broadcast shape of the joint (non-slice) part.
    let mut bcast: Shape = SmallVec::new();
    for (axis, slot) in slots.iter().enumerate() {
        if let Slot::Core(a) = slot {
            bcast = match broadcast_shapes(&bcast, a.shape()) {
                Some(s) => s,
                None => {
                    return crate::errors::index::BroadcastMismatchSnafu {
                        shape: a.shape().to_vec(),
                        axis,
                        against: bcast.to_vec(),
                    }
                    .fail()
                }
            };
        }
    }

    let n_slices = slots
        .iter()
        .filter(|s| matches!(s, Slot::Progression(_)))
        .count();
    let total = bcast.len() + n_slices;

    let mut result_shape: Shape = bcast.clone();
    for slot in slots.iter() {
        if let Slot::Progression(s) = slot {
            result_shape.push(s.len);
        }
    }

    let mut arrays: SmallVec<[IndexArray; 4]> = SmallVec::with_capacity(slots.len());
    let mut slice_pos = 0usize;
    for slot in slots.into_iter() {
        match slot {
            Slot::Core(a) => {
                // Right-align into the broadcast part, then trail with unit
                // axes for every slice-held dimension.
                let mut s: Shape = SmallVec::with_capacity(total);
                for i in 0..bcast.len() {
                    s.push(padded_dim(a.shape(), i, bcast.len()));
                }
                for _ in 0..n_slices {
                    s.push(1);
                }
                arrays.push(a.reshaped(s));
            }
            Slot::Progression(cs) => {
                let mut s: Shape = SmallVec::with_capacity(total);
                for _ in 0..bcast.len() + slice_pos {
                    s.push(1);
                }
                s.push(cs.len);
                for _ in slice_pos + 1..n_slices {
                    s.push(1);
                }
                let values: Vec<i64> = cs.iter().map(|v| v as i64).collect();
                arrays.push(IndexArray::new(s, values));
                slice_pos += 1;
            }
        }
    }

    Ok(Indexer::Vectorized(VectorizedIndexer::from_padded(
        arrays,
        result_shape,
    )))
}

fn normalize_index(index: i64, axis: usize, len: u64) -> IndexResult<u64> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return OutOfBoundsSnafu { index, axis, len }.fail();
    }
    Ok(resolved as u64)
}

fn normalize_positions(values: &[i64], axis: usize, len: u64) -> IndexResult<Vec<u64>> {
    values
        .iter()
        .map(|&v| normalize_index(v, axis, len))
        .collect()
}

fn normalize_array(array: &IndexArray, axis: usize, len: u64) -> IndexResult<IndexArray> {
    // Bounds-check before mapping so the error names the offending value.
    for &v in array.values() {
        normalize_index(v, axis, len)?;
    }
    Ok(array.map(|v| if v < 0 { v + len as i64 } else { v }))
}

fn mask_positions(mask: &[bool], axis: usize, len: u64) -> IndexResult<Vec<u64>> {
    if mask.len() as u64 != len {
        return MaskLengthMismatchSnafu {
            mask_len: mask.len() as u64,
            axis,
            len,
        }
        .fail();
    }
    Ok(mask
        .iter()
        .enumerate()
        .filter_map(|(i, &keep)| keep.then_some(i as u64))
        .collect())
}

/// Resolve a Python-style slice against an axis of length `n`.
///
/// Matches CPython's `PySlice_GetIndicesEx` clamping, including negative
/// steps and out-of-range bounds.
fn normalize_slice(s: &Slice, axis: usize, n: u64) -> IndexResult<CSlice> {
    let step = s.step.unwrap_or(1);
    if step == 0 {
        return ZeroStepSnafu { axis }.fail();
    }
    let n = n as i64;
    let (lower, upper) = if step < 0 { (-1, n - 1) } else { (0, n) };

    let resolve = |bound: Option<i64>, default: i64| -> i64 {
        match bound {
            None => default,
            Some(v) => {
                let v = if v < 0 { v + n } else { v };
                v.clamp(lower, upper)
            }
        }
    };
    let start = resolve(s.start, if step < 0 { upper } else { lower });
    let stop = resolve(s.stop, if step < 0 { lower } else { upper });

    let len = if step > 0 {
        if stop > start {
            ((stop - start - 1) / step + 1) as u64
        } else {
            0
        }
    } else if start > stop {
        ((start - stop - 1) / (-step) + 1) as u64
    } else {
        0
    };

    Ok(CSlice {
        start: if len == 0 { 0 } else { start },
        step,
        len,
    })
}
