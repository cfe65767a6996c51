use snafu::prelude::*;

/// Error type for indexing-expression classification and composition.
///
/// All variants are raised at call time; nothing here is deferred to
/// materialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum IndexError {
    #[snafu(display(
        "too many indexers: expression has {provided} terms but the array has rank {rank}"
    ))]
    TooManyTerms { provided: usize, rank: usize },

    #[snafu(display("an indexing expression may contain at most one ellipsis"))]
    MultipleEllipsis,

    #[snafu(display("index {index} is out of bounds for axis {axis} with length {len}"))]
    OutOfBounds { index: i64, axis: usize, len: u64 },

    #[snafu(display("slice step must be nonzero (axis {axis})"))]
    ZeroStep { axis: usize },

    #[snafu(display(
        "boolean mask of length {mask_len} does not match axis {axis} with length {len}"
    ))]
    MaskLengthMismatch { mask_len: u64, axis: usize, len: u64 },

    #[snafu(display(
        "index array of shape {shape:?} (axis {axis}) does not broadcast against {against:?}"
    ))]
    BroadcastMismatch { shape: Vec<u64>, axis: usize, against: Vec<u64> },

    #[snafu(display(
        "{backend} backend does not support {kind} indexing; \
         load the array with materialize() first (given {key})"
    ))]
    UnsupportedIndexKind { backend: String, kind: String, key: String },

    #[snafu(display(
        "cannot compose {next} onto a pending vectorized selection; \
         materialize the pending selection first (pending {pending})"
    ))]
    UnsupportedComposition { pending: String, next: String },
}

pub type IndexResult<T> = Result<T, IndexError>;
