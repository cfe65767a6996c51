//! Boundary traits for the third-party gridded-data format library.
//!
//! The concrete reader is an external collaborator: this module specifies
//! only what the adapter needs from it. Handles are closed by dropping them;
//! element access is strictly slice-based (integers and canonical slices),
//! which is why adapters over this boundary reject array-valued keys.

use std::collections::BTreeMap;
use std::path::Path;

use smallvec::SmallVec;

use crate::data::{ArrayData, DataType, Scalar};
use crate::errors::BackendResult;
use crate::indexing::BasicTerm;
use crate::shape::Shape;
use crate::IStr;

/// Mode forwarded to the format library's open call. The engine itself never
/// writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadWrite,
}

/// An attribute payload attached to a file or variable.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    I64(i64),
    F64(f64),
}

pub type AttrMap = BTreeMap<IStr, AttrValue>;

/// The format library itself: one `open` entry point.
pub trait FormatLibrary: Send + Sync {
    type Handle: FormatHandle;

    /// Short library name used in error messages ("netcdf", "grib", ...).
    fn name(&self) -> &'static str;

    fn open(&self, path: &Path, mode: OpenMode) -> BackendResult<Self::Handle>;
}

/// An open file of the format. Dropping the handle closes it.
///
/// Handles own their resources outright (`'static`), so they can sit behind
/// shared store state.
pub trait FormatHandle: Send + Sync + 'static {
    type Variable: FormatVariable;

    /// Turn off the library's native fill-value masking; the host data model
    /// owns fill-value handling. Called on every open, so handles reopened
    /// under autoclose never come back with masking re-enabled.
    fn disable_auto_masking(&self);

    fn variable_names(&self) -> Vec<IStr>;

    fn variable(&self, name: &str) -> BackendResult<Self::Variable>;

    /// Global file attributes.
    fn attrs(&self) -> AttrMap;

    /// Dimension names with their sizes.
    fn dimensions(&self) -> Vec<(IStr, u64)>;

    /// Whether a dimension is unlimited (growable).
    fn is_unlimited(&self, dim: &str) -> bool;
}

/// One variable within an open file.
pub trait FormatVariable: Send + Sync {
    fn dims(&self) -> SmallVec<[IStr; 4]>;

    fn shape(&self) -> Shape;

    fn dtype(&self) -> DataType;

    fn attrs(&self) -> AttrMap;

    /// Strided block read: one canonical term per axis.
    fn read_block(&self, key: &[BasicTerm]) -> BackendResult<ArrayData>;

    /// The value of a zero-rank variable, as a bare scalar.
    fn get_value(&self) -> BackendResult<Scalar>;
}
