//! Lazy composition of canonical indexers.
//!
//! `compose(pending, next)` produces the indexer equivalent to applying
//! `pending` and then `next`, without touching storage. All nine
//! pending x next pairs are handled explicitly:
//!
//! - basic/outer pending with basic/outer next: per-axis affine and gather
//!   arithmetic;
//! - basic/outer pending with vectorized next: the incoming per-axis arrays
//!   are transformed elementwise;
//! - vectorized pending with basic next: the pending index arrays are
//!   re-gathered through the new key (pure index-space work);
//! - vectorized pending with outer or vectorized next: unsupported; the
//!   caller must materialize the pending selection first.
//!
//! Outer and joint semantics differ, so none of these pairs is derived from
//! another by symmetry.

use smallvec::SmallVec;

use crate::errors::index::{TooManyTermsSnafu, UnsupportedCompositionSnafu};
use crate::errors::IndexResult;
use crate::indexing::expr::IndexArray;
use crate::indexing::indexer::{
    BasicTerm, CSlice, Indexer, OuterTerm, VectorizedIndexer,
};
use crate::shape::{element_count, for_each_index, Shape};

/// Compose `next` (classified against `pending.result_shape()`) onto
/// `pending`.
pub fn compose(pending: &Indexer, next: &Indexer) -> IndexResult<Indexer> {
    let inner_rank = pending.result_shape().len();
    if next.rank() != inner_rank {
        return TooManyTermsSnafu {
            provided: next.rank(),
            rank: inner_rank,
        }
        .fail();
    }

    match (pending, next) {
        (Indexer::Basic(p), Indexer::Basic(n)) => {
            Ok(Indexer::outer(walk(p.iter().cloned().map(OuterTerm::from), &as_outer(n))))
        }
        (Indexer::Basic(p), Indexer::Outer(n)) => {
            Ok(Indexer::outer(walk(p.iter().cloned().map(OuterTerm::from), n)))
        }
        (Indexer::Outer(p), Indexer::Basic(n)) => {
            Ok(Indexer::outer(walk(p.iter().cloned(), &as_outer(n))))
        }
        (Indexer::Outer(p), Indexer::Outer(n)) => {
            Ok(Indexer::outer(walk(p.iter().cloned(), n)))
        }
        (Indexer::Basic(p), Indexer::Vectorized(v)) => {
            Ok(joint_next(p.iter().cloned().map(OuterTerm::from), v))
        }
        (Indexer::Outer(p), Indexer::Vectorized(v)) => Ok(joint_next(p.iter().cloned(), v)),
        (Indexer::Vectorized(p), Indexer::Basic(n)) => Ok(basic_on_joint(p, n)),
        (Indexer::Vectorized(_), _) => UnsupportedCompositionSnafu {
            pending: pending.to_string(),
            next: next.to_string(),
        }
        .fail(),
    }
}

fn as_outer(terms: &[BasicTerm]) -> SmallVec<[OuterTerm; 4]> {
    terms.iter().cloned().map(OuterTerm::from).collect()
}

/// Per-axis walk for the basic/outer quadrant. Pending integer axes were
/// dropped from the intermediate result, so they consume nothing from
/// `next`; every kept axis pairs with exactly one incoming term.
fn walk(
    pending: impl Iterator<Item = OuterTerm>,
    next: &[OuterTerm],
) -> SmallVec<[OuterTerm; 4]> {
    let mut out: SmallVec<[OuterTerm; 4]> = SmallVec::new();
    let mut incoming = next.iter();
    for p in pending {
        let composed = match p {
            OuterTerm::Index(i) => OuterTerm::Index(i),
            OuterTerm::Slice(s) => match incoming.next() {
                Some(n) => slice_then(s, n),
                None => unreachable!("rank checked before walking"),
            },
            OuterTerm::Array(a) => match incoming.next() {
                Some(n) => array_then(&a, n),
                None => unreachable!("rank checked before walking"),
            },
        };
        out.push(composed);
    }
    out
}

fn slice_then(s: CSlice, next: &OuterTerm) -> OuterTerm {
    match next {
        OuterTerm::Index(i) => OuterTerm::Index(s.nth(*i)),
        OuterTerm::Slice(t) => {
            if t.len == 0 {
                OuterTerm::Slice(CSlice { start: 0, step: s.step * t.step, len: 0 })
            } else {
                OuterTerm::Slice(CSlice {
                    start: s.start + t.start * s.step,
                    step: s.step * t.step,
                    len: t.len,
                })
            }
        }
        OuterTerm::Array(a) => OuterTerm::Array(a.iter().map(|&i| s.nth(i)).collect()),
    }
}

fn array_then(a: &[u64], next: &OuterTerm) -> OuterTerm {
    match next {
        OuterTerm::Index(i) => OuterTerm::Index(a[*i as usize]),
        OuterTerm::Slice(t) => OuterTerm::Array(t.iter().map(|i| a[i as usize]).collect()),
        OuterTerm::Array(b) => OuterTerm::Array(b.iter().map(|&i| a[i as usize]).collect()),
    }
}

/// Basic/outer pending, vectorized next: transform each incoming per-axis
/// array elementwise. Dropped (integer) pending axes reappear as
/// all-broadcasting constants.
fn joint_next(pending: impl Iterator<Item = OuterTerm>, v: &VectorizedIndexer) -> Indexer {
    let rank = v.shape().len();
    let unit: Shape = (0..rank).map(|_| 1u64).collect();
    let mut arrays: SmallVec<[IndexArray; 4]> = SmallVec::new();
    let mut incoming = v.arrays().iter();
    for p in pending {
        let composed = match p {
            OuterTerm::Index(i) => IndexArray::new(unit.clone(), vec![i as i64]),
            OuterTerm::Slice(s) => match incoming.next() {
                Some(a) => a.map(|j| s.start + j * s.step),
                None => unreachable!("rank checked before walking"),
            },
            OuterTerm::Array(arr) => match incoming.next() {
                Some(a) => a.map(|j| arr[j as usize] as i64),
                None => unreachable!("rank checked before walking"),
            },
        };
        arrays.push(composed);
    }
    Indexer::Vectorized(VectorizedIndexer::from_padded(
        arrays,
        v.shape().iter().copied().collect(),
    ))
}

/// Vectorized pending, basic next: the new key selects positions within the
/// joint result, so each pending index array is re-gathered at those
/// positions. No storage access; only the index arrays move.
fn basic_on_joint(pending: &VectorizedIndexer, next: &[BasicTerm]) -> Indexer {
    let out_shape: Shape = next
        .iter()
        .filter_map(|t| match t {
            BasicTerm::Index(_) => None,
            BasicTerm::Slice(s) => Some(s.len),
        })
        .collect();

    let count = element_count(&out_shape) as usize;
    let mut arrays: SmallVec<[IndexArray; 4]> = SmallVec::new();
    let mut src: Shape = pending.shape().iter().map(|_| 0).collect();
    for a in pending.arrays() {
        let mut data = Vec::with_capacity(count);
        for_each_index(&out_shape, |out_ix| {
            let mut kept = 0usize;
            for (axis, t) in next.iter().enumerate() {
                src[axis] = match t {
                    BasicTerm::Index(i) => *i,
                    BasicTerm::Slice(s) => {
                        let v = s.nth(out_ix[kept]);
                        kept += 1;
                        v
                    }
                };
            }
            data.push(a.get_broadcast(&src));
        });
        arrays.push(IndexArray::new(out_shape.clone(), data));
    }
    Indexer::Vectorized(VectorizedIndexer::from_padded(arrays, out_shape))
}
