use tracing::debug;

use crate::backend::{DynIndexableArray, IndexableArray};
use crate::data::{ArrayData, DataType, Scalar};
use crate::errors::{BackendResult, IndexResult};
use crate::indexing::classify::classify;
use crate::indexing::compose::compose;
use crate::indexing::expr::IndexExpr;
use crate::indexing::indexer::Indexer;
use crate::shape::{len_of, Shape};

/// A backend array with a pending, not-yet-executed selection.
///
/// Indexing a `LazyArray` composes indexers without touching storage; only
/// [`materialize`](LazyArray::materialize) performs the real read, and it
/// performs exactly one. The wrapper references the backend array (shared
/// ownership of the adapter handle) but owns its pending indexer.
#[derive(Clone)]
pub struct LazyArray {
    source: DynIndexableArray,
    key: Indexer,
    shape: Shape,
}

impl std::fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyArray")
            .field("backend", &self.source.backend_name())
            .field("key", &format_args!("{}", self.key))
            .field("shape", &self.shape)
            .finish()
    }
}

impl LazyArray {
    /// Wrap a backend array with the identity selection.
    pub fn new(source: DynIndexableArray) -> LazyArray {
        let key = Indexer::full(source.shape());
        let shape = key.result_shape();
        LazyArray { source, key, shape }
    }

    /// Shape of the pending selection. Fixed at construction; never reads.
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Element type of the backend array. Fixed at construction.
    pub fn dtype(&self) -> DataType {
        self.source.dtype()
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Length along the first axis, when there is one.
    pub fn len(&self) -> Option<u64> {
        len_of(&self.shape)
    }

    /// The accumulated canonical indexer.
    pub fn key(&self) -> &Indexer {
        &self.key
    }

    /// Classify a raw expression against the current shape and compose it.
    /// Never touches storage.
    pub fn index(&self, expr: &IndexExpr) -> IndexResult<LazyArray> {
        let next = classify(expr, &self.shape)?;
        self.apply(&next)
    }

    /// Compose an already-canonical indexer. Never touches storage.
    pub fn apply(&self, next: &Indexer) -> IndexResult<LazyArray> {
        let key = compose(&self.key, next)?;
        let shape = key.result_shape();
        Ok(LazyArray {
            source: self.source.clone(),
            key,
            shape,
        })
    }

    /// Execute the pending selection: exactly one backend read.
    pub fn materialize(&self) -> BackendResult<ArrayData> {
        debug!(
            backend = self.source.backend_name(),
            key = %self.key,
            "materializing lazy selection"
        );
        self.source.read(&self.key)
    }

    /// Materialize a zero-rank selection down to its single value.
    pub fn materialize_value(&self) -> BackendResult<Scalar> {
        self.materialize()?.into_scalar()
    }
}
