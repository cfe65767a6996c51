//! Backend adapter contract.
//!
//! Every storage adapter implements [`IndexableArray`] explicitly: a shape, an
//! element type, a declared capability set, and element access through a
//! canonical indexer. Nothing is duck-typed; an adapter that cannot service a
//! kind rejects it up front through [`ensure_supported`].

pub mod format;
pub mod grid;
pub mod memory;

use std::sync::Arc;

use crate::data::{ArrayData, DataType};
use crate::errors::index::UnsupportedIndexKindSnafu;
use crate::errors::{BackendResult, IndexResult};
use crate::indexing::{IndexKind, Indexer};

/// Which canonical indexer kinds a backend can service.
///
/// Basic indexing (integers and slices) is mandatory for every backend and
/// has no flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSupport {
    /// Outer keys that carry per-axis index arrays (formats restricted to
    /// contiguous/strided access cannot service these).
    pub outer_arrays: bool,
    /// Joint (fancy) keys.
    pub vectorized: bool,
}

impl IndexSupport {
    /// Strided access only: integers and slices.
    pub fn strided() -> IndexSupport {
        IndexSupport::default()
    }

    /// Everything, including joint indexing.
    pub fn all() -> IndexSupport {
        IndexSupport { outer_arrays: true, vectorized: true }
    }
}

/// A not-yet-read backend array: the minimal capability set every adapter
/// provides.
pub trait IndexableArray: Send + Sync {
    /// Shape, fixed at adapter construction.
    fn shape(&self) -> &[u64];

    /// Element type, fixed at adapter construction.
    fn dtype(&self) -> DataType;

    /// Which indexer kinds `read` will accept.
    fn capabilities(&self) -> IndexSupport;

    /// Short backend name used in unsupported-kind messages.
    fn backend_name(&self) -> &'static str;

    /// Perform the real read for a canonical indexer.
    ///
    /// This is the only operation that touches storage.
    fn read(&self, key: &Indexer) -> BackendResult<ArrayData>;
}

/// A type-erased adapter that can be shared across wrappers.
pub type DynIndexableArray = Arc<dyn IndexableArray>;

impl<T: IndexableArray + ?Sized> IndexableArray for Arc<T> {
    fn shape(&self) -> &[u64] {
        (**self).shape()
    }
    fn dtype(&self) -> DataType {
        (**self).dtype()
    }
    fn capabilities(&self) -> IndexSupport {
        (**self).capabilities()
    }
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
    fn read(&self, key: &Indexer) -> BackendResult<ArrayData> {
        (**self).read(key)
    }
}

/// Reject `key` when `caps` cannot service it, naming the indexer and
/// directing the caller to materialize eagerly first.
pub fn ensure_supported(caps: IndexSupport, key: &Indexer, backend: &str) -> IndexResult<()> {
    let supported = match key.kind() {
        IndexKind::Basic => true,
        IndexKind::Outer => caps.outer_arrays,
        IndexKind::Vectorized => caps.vectorized,
    };
    if supported {
        return Ok(());
    }
    UnsupportedIndexKindSnafu {
        backend: backend.to_string(),
        kind: key.kind().to_string(),
        key: key.to_string(),
    }
    .fail()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IndexError;
    use crate::indexing::{classify, IndexExpr};

    #[test]
    fn strided_backend_rejects_outer_arrays() {
        let key = classify(&IndexExpr::empty().int_array(vec![0, 2]), &[4]).unwrap();
        let err = ensure_supported(IndexSupport::strided(), &key, "demo").unwrap_err();
        match &err {
            IndexError::UnsupportedIndexKind { backend, kind, key } => {
                assert_eq!(backend, "demo");
                assert_eq!(kind, "outer");
                assert!(key.contains("[0, 2]"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("materialize()"));
    }

    #[test]
    fn basic_is_always_supported() {
        let key = Indexer::full(&[4]);
        assert!(ensure_supported(IndexSupport::strided(), &key, "demo").is_ok());
    }
}
