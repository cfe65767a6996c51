//! Host data-model boundary types.
//!
//! Stores produce these; the labeled-array layer above consumes them. All
//! mappings are exposed frozen: they are built once per call and never
//! mutated through this surface.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use smallvec::SmallVec;

use crate::backend::format::{AttrMap, AttrValue, FormatLibrary};
use crate::backend::grid::GridStore;
use crate::data::{ArrayData, DataType};
use crate::errors::{BackendResult, IndexResult};
use crate::indexing::{classify, IndexExpr, LazyArray};
use crate::IStr;

/// An immutable mapping with deterministic (sorted) iteration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frozen<K, V>(BTreeMap<K, V>);

impl<K: Ord, V> Frozen<K, V> {
    pub fn new(map: BTreeMap<K, V>) -> Frozen<K, V> {
        Frozen(map)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.0.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.0.iter()
    }
}

impl<K: Ord, V> From<BTreeMap<K, V>> for Frozen<K, V> {
    fn from(map: BTreeMap<K, V>) -> Frozen<K, V> {
        Frozen(map)
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a Frozen<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = std::collections::btree_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Once-derived encoding metadata for a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Encoding {
    /// Names of unlimited (growable) dimensions.
    pub unlimited_dims: BTreeSet<IStr>,
}

/// A named-dimension view over a lazily indexed data source.
#[derive(Debug, Clone)]
pub struct Variable {
    dims: SmallVec<[IStr; 4]>,
    data: LazyArray,
    attrs: Frozen<IStr, AttrValue>,
}

impl Variable {
    pub fn new(dims: SmallVec<[IStr; 4]>, data: LazyArray, attrs: AttrMap) -> Variable {
        Variable {
            dims,
            data,
            attrs: Frozen::new(attrs),
        }
    }

    pub fn dims(&self) -> &[IStr] {
        &self.dims
    }

    pub fn data(&self) -> &LazyArray {
        &self.data
    }

    pub fn attrs(&self) -> &Frozen<IStr, AttrValue> {
        &self.attrs
    }

    pub fn shape(&self) -> &[u64] {
        self.data.shape()
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    /// Lazily select into the variable; dimensions dropped by integer axes
    /// disappear from `dims`. A joint (vectorized) selection replaces the
    /// indexed axes entirely, so its result carries no dimension names —
    /// naming the broadcast axes belongs to the labeled layer above.
    pub fn index(&self, expr: &IndexExpr) -> IndexResult<Variable> {
        let next = classify(expr, self.data.shape())?;
        let dims: SmallVec<[IStr; 4]> = match next.kept_axes() {
            Some(kept) => self
                .dims
                .iter()
                .zip(kept)
                .filter_map(|(d, keep)| keep.then(|| d.clone()))
                .collect(),
            None => SmallVec::new(),
        };
        let data = self.data.apply(&next)?;
        Ok(Variable {
            dims,
            data,
            attrs: self.attrs.clone(),
        })
    }

    /// Materialize the pending selection.
    pub fn load(&self) -> BackendResult<ArrayData> {
        self.data.materialize()
    }
}

/// A frozen view of everything a store exposes.
#[derive(Debug)]
pub struct Dataset {
    variables: Frozen<IStr, Variable>,
    attrs: Frozen<IStr, AttrValue>,
    dims: Frozen<IStr, u64>,
    encoding: Encoding,
}

impl Dataset {
    /// Build the full view from a store in one pass.
    pub fn from_store<L: FormatLibrary + 'static>(store: &GridStore<L>) -> BackendResult<Dataset> {
        Ok(Dataset {
            variables: store.variables()?,
            attrs: store.attrs()?,
            dims: store.dimensions()?,
            encoding: store.encoding().clone(),
        })
    }

    pub fn variables(&self) -> &Frozen<IStr, Variable> {
        &self.variables
    }

    pub fn attrs(&self) -> &Frozen<IStr, AttrValue> {
        &self.attrs
    }

    pub fn dims(&self) -> &Frozen<IStr, u64> {
        &self.dims
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }
}
