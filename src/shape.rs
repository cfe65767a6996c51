//! Small free-function helpers shared by wrappers and backends.
//!
//! Wrappers compose these explicitly instead of inheriting them, so each
//! caller states exactly which behavior it derives from its shape.

use smallvec::SmallVec;

/// Shape vector used throughout the crate (arrays are rarely deeper than 4-D).
pub type Shape = SmallVec<[u64; 4]>;

/// Length of an array along its first axis, if it has one.
pub fn len_of(shape: &[u64]) -> Option<u64> {
    shape.first().copied()
}

/// Total number of elements for a row-major array of the given shape.
///
/// The empty shape (zero rank) has exactly one element.
pub fn element_count(shape: &[u64]) -> u64 {
    shape.iter().product()
}

/// Row-major strides, in elements.
pub fn strides_row_major(shape: &[u64]) -> Shape {
    let mut strides: Shape = SmallVec::with_capacity(shape.len());
    let mut acc = 1u64;
    for &dim in shape.iter().rev() {
        strides.push(acc);
        acc = acc.saturating_mul(dim);
    }
    strides.reverse();
    strides
}

/// Broadcast two shapes against each other, right-aligned, size-1 dims
/// stretching. Returns `None` when the shapes are incompatible.
pub fn broadcast_shapes(a: &[u64], b: &[u64]) -> Option<Shape> {
    let rank = a.len().max(b.len());
    let mut out: Shape = SmallVec::with_capacity(rank);
    for i in 0..rank {
        let da = padded_dim(a, i, rank);
        let db = padded_dim(b, i, rank);
        let merged = match (da, db) {
            (1, d) | (d, 1) => d,
            (x, y) if x == y => x,
            _ => return None,
        };
        out.push(merged);
    }
    Some(out)
}

/// Visit every multi-index of `shape` in row-major order.
///
/// A zero-rank shape has exactly one (empty) index; any zero-length axis
/// means no visits at all.
pub fn for_each_index(shape: &[u64], mut f: impl FnMut(&[u64])) {
    if shape.iter().any(|&d| d == 0) {
        return;
    }
    let mut index: Shape = shape.iter().map(|_| 0).collect();
    loop {
        f(&index);
        let mut axis = shape.len();
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
}

/// Dimension `i` of `shape` once right-aligned into `rank` axes; missing
/// leading axes behave as size 1.
pub fn padded_dim(shape: &[u64], i: usize, rank: usize) -> u64 {
    let pad = rank - shape.len();
    if i >= pad {
        shape[i - pad]
    } else {
        1
    }
}
