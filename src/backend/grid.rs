//! Generic store and array adapter over a [`FormatLibrary`].
//!
//! `GridStore` binds one file of an external gridded-data format into the
//! host data model: frozen variable/attribute/dimension mappings, a
//! once-derived encoding, and an explicit close. Each variable is wrapped in
//! a [`LazyArray`] over a [`GridArrayAdapter`], so no element data is read
//! until a selection is materialized.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::backend::format::{
    AttrValue, FormatHandle, FormatLibrary, FormatVariable, OpenMode,
};
use crate::backend::{ensure_supported, IndexSupport, IndexableArray};
use crate::data::{ArrayData, DataType};
use crate::errors::{BackendResult, BackendError};
use crate::indexing::{Indexer, LazyArray};
use crate::model::{Encoding, Frozen, Variable};
use crate::shape::Shape;
use crate::store::{StoreHandle, StoreOpener};
use crate::IStr;

/// Opener that runs the format library's open call and immediately disables
/// its native fill-value masking, on the first open and on every autoclose
/// reopen alike.
pub struct FormatOpener<L: FormatLibrary> {
    library: L,
    path: PathBuf,
    mode: OpenMode,
}

impl<L: FormatLibrary> StoreOpener for FormatOpener<L> {
    type Handle = L::Handle;

    fn open(&self) -> BackendResult<L::Handle> {
        debug!(path = %self.path.display(), library = self.library.name(), "opening store");
        let handle = self.library.open(&self.path, self.mode)?;
        handle.disable_auto_masking();
        Ok(handle)
    }
}

/// A store for one file of a gridded-data format.
pub struct GridStore<L: FormatLibrary + 'static> {
    store: Arc<StoreHandle<FormatOpener<L>>>,
    encoding: Encoding,
    autoclose: bool,
    library_name: &'static str,
}

impl<L: FormatLibrary + 'static> GridStore<L> {
    /// Open a file, probe its encoding once, and (under the autoclose
    /// policy) release the handle again so later accesses reopen
    /// transiently.
    pub fn open(
        library: L,
        path: impl Into<PathBuf>,
        mode: OpenMode,
        autoclose: bool,
    ) -> BackendResult<GridStore<L>> {
        let library_name = library.name();
        let opener = FormatOpener { library, path: path.into(), mode };
        let store = StoreHandle::new_open(opener)?;

        let encoding = {
            let scope = store.scoped_open(true)?;
            let unlimited = scope
                .dimensions()
                .into_iter()
                .filter(|(name, _)| scope.is_unlimited(name))
                .map(|(name, _)| name)
                .collect();
            Encoding { unlimited_dims: unlimited }
        };

        if autoclose {
            store.close();
        }
        Ok(GridStore {
            store: Arc::new(store),
            encoding,
            autoclose,
            library_name,
        })
    }

    /// Every variable in the file, each wrapped in a lazy data source.
    ///
    /// Shape and element type are probed here, once per variable; all later
    /// element access goes through the canonical-indexer path.
    pub fn variables(&self) -> BackendResult<Frozen<IStr, Variable>> {
        let scope = self.store.scoped_open(true)?;
        let mut out = BTreeMap::new();
        for name in scope.variable_names() {
            let var = scope.variable(&name)?;
            out.insert(name.clone(), self.open_store_variable(name, &var));
        }
        Ok(Frozen::new(out))
    }

    fn open_store_variable(
        &self,
        name: IStr,
        var: &<L::Handle as FormatHandle>::Variable,
    ) -> Variable {
        let adapter = GridArrayAdapter {
            store: self.store.clone(),
            name: name.clone(),
            shape: var.shape(),
            dtype: var.dtype(),
            library_name: self.library_name,
        };
        let data = LazyArray::new(Arc::new(adapter));
        Variable::new(var.dims(), data, var.attrs())
    }

    /// Global file attributes.
    pub fn attrs(&self) -> BackendResult<Frozen<IStr, AttrValue>> {
        let scope = self.store.scoped_open(true)?;
        Ok(Frozen::new(scope.attrs()))
    }

    /// Dimension names and sizes.
    pub fn dimensions(&self) -> BackendResult<Frozen<IStr, u64>> {
        let scope = self.store.scoped_open(true)?;
        Ok(Frozen::new(scope.dimensions().into_iter().collect()))
    }

    /// Encoding metadata, derived once at open.
    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    pub fn autoclose(&self) -> bool {
        self.autoclose
    }

    pub fn is_open(&self) -> bool {
        self.store.is_open()
    }

    /// Explicitly close the underlying handle. Further access requires
    /// autoclose.
    pub fn close(&self) {
        self.store.close();
    }
}

/// Binds one variable name within a store to its shape and element type.
///
/// Constructed with metadata from a single probe; every read opens its own
/// access scope, so adapters stay valid across autoclose cycles.
pub struct GridArrayAdapter<L: FormatLibrary + 'static> {
    store: Arc<StoreHandle<FormatOpener<L>>>,
    name: IStr,
    shape: Shape,
    dtype: DataType,
    library_name: &'static str,
}

impl<L: FormatLibrary + 'static> IndexableArray for GridArrayAdapter<L> {
    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn dtype(&self) -> DataType {
        self.dtype
    }

    fn capabilities(&self) -> IndexSupport {
        // Slice-based formats only do contiguous/strided access.
        IndexSupport::strided()
    }

    fn backend_name(&self) -> &'static str {
        self.library_name
    }

    fn read(&self, key: &Indexer) -> BackendResult<ArrayData> {
        ensure_supported(self.capabilities(), key, self.library_name)?;
        let scope = self.store.scoped_open(true)?;
        let var = scope.variable(&self.name)?;

        let terms = match key {
            Indexer::Basic(terms) => terms,
            // ensure_supported rejected everything else for this
            // capability set.
            _ => {
                return Err(BackendError::read_failed(
                    self.name.clone(),
                    format!("unexpected indexer kind {}", key.kind()),
                ))
            }
        };

        if terms.is_empty() && self.shape.is_empty() {
            // Zero-rank access: the format returns the bare value, not a
            // zero-dimensional container.
            return Ok(ArrayData::from_scalar(var.get_value()?));
        }
        var.read_block(terms)
    }
}

impl<L: FormatLibrary + 'static> GridArrayAdapter<L> {
    /// The variable name this adapter is bound to.
    pub fn variable_name(&self) -> &IStr {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataBuffer, Scalar};
    use crate::errors::IndexError;
    use crate::indexing::expr::{IndexExpr, Slice};
    use crate::model::Dataset;
    use crate::testing::MemoryFormat;
    use crate::IntoIStr;
    use std::sync::atomic::Ordering;

    fn demo_format() -> MemoryFormat {
        MemoryFormat::new()
            .with_dim("t", 3, true)
            .with_dim("x", 4, false)
            .with_var(
                "temperature",
                &["t", "x"],
                ArrayData::new([3u64, 4u64].as_slice(), DataBuffer::F64((0..12).map(|v| v as f64).collect())),
            )
            .with_var("level", &[], ArrayData::from_scalar(Scalar::I32(7)))
            .with_attr("title", AttrValue::Str("demo file".into()))
    }

    #[test]
    fn variables_wrap_lazy_sources() {
        let fmt = demo_format();
        let reads = fmt.counters().block_reads.clone();
        let store = GridStore::open(fmt, "demo.grd", OpenMode::Read, false).unwrap();
        let vars = store.variables().unwrap();
        assert_eq!(vars.len(), 2);
        let temp = vars.get("temperature").unwrap();
        assert_eq!(temp.shape(), &[3, 4]);
        assert_eq!(temp.dtype(), DataType::F64);
        assert_eq!(temp.dims(), &["t".istr(), "x".istr()]);
        // enumerating variables must not read any element data
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn end_to_end_lazy_row_selection() {
        let store =
            GridStore::open(demo_format(), "demo.grd", OpenMode::Read, false).unwrap();
        let vars = store.variables().unwrap();
        let temp = vars.get("temperature").unwrap();
        let row = temp
            .index(&IndexExpr::empty().slice(Slice::range(1, 3)).full())
            .unwrap()
            .index(&IndexExpr::empty().index(0).full())
            .unwrap();
        assert_eq!(row.dims(), &["x".istr()]);
        let got = row.load().unwrap();
        assert_eq!(got.shape(), &[4]);
        assert_eq!(got.buffer(), &DataBuffer::F64(vec![4.0, 5.0, 6.0, 7.0]));
    }

    #[test]
    fn zero_rank_variable_yields_scalar() {
        let store =
            GridStore::open(demo_format(), "demo.grd", OpenMode::Read, false).unwrap();
        let vars = store.variables().unwrap();
        let level = vars.get("level").unwrap();
        let selected = level.index(&IndexExpr::empty()).unwrap();
        assert_eq!(
            selected.data().materialize_value().unwrap(),
            Scalar::I32(7)
        );
    }

    #[test]
    fn array_keys_are_rejected_naming_the_indexer() {
        let store =
            GridStore::open(demo_format(), "demo.grd", OpenMode::Read, false).unwrap();
        let vars = store.variables().unwrap();
        let temp = vars.get("temperature").unwrap();
        let masked = temp
            .index(&IndexExpr::empty().bool_array(vec![true, false, true]).full())
            .unwrap();
        let err = masked.load().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("outer"), "names the kind: {msg}");
        assert!(msg.contains("[0, 2]"), "names the indexer: {msg}");
        assert!(msg.contains("materialize()"), "directs eager load: {msg}");
        assert!(matches!(
            err,
            BackendError::Index { source: IndexError::UnsupportedIndexKind { .. } }
        ));
    }

    #[test]
    fn autoclose_store_reopens_per_access() {
        let fmt = demo_format();
        let counters = fmt.counters();
        let store = GridStore::open(fmt, "demo.grd", OpenMode::Read, true).unwrap();
        // construction probe opened once, then released the handle
        assert!(!store.is_open());
        let opens_after_probe = counters.opens.load(Ordering::SeqCst);

        let vars = store.variables().unwrap();
        let temp = vars.get("temperature").unwrap();
        let _ = temp.load().unwrap();
        let _ = temp.load().unwrap();
        assert!(!store.is_open());
        // one reopen for the enumeration, one per materialization
        assert_eq!(counters.opens.load(Ordering::SeqCst), opens_after_probe + 3);
        assert_eq!(
            counters.closes.load(Ordering::SeqCst),
            counters.opens.load(Ordering::SeqCst)
        );
    }

    #[test]
    fn masking_disabled_on_every_reopen() {
        let fmt = demo_format();
        let counters = fmt.counters();
        let store = GridStore::open(fmt, "demo.grd", OpenMode::Read, true).unwrap();
        let vars = store.variables().unwrap();
        let temp = vars.get("temperature").unwrap();
        let _ = temp.load().unwrap();
        assert_eq!(
            counters.masking_disabled.load(Ordering::SeqCst),
            counters.opens.load(Ordering::SeqCst)
        );
    }

    #[test]
    fn closed_store_without_autoclose_fails() {
        let store =
            GridStore::open(demo_format(), "demo.grd", OpenMode::Read, false).unwrap();
        let vars = store.variables().unwrap();
        store.close();
        let temp = vars.get("temperature").unwrap();
        // adapters always access under autoclose, so reads still succeed...
        assert!(temp.load().is_ok());
        // ...but a non-autoclose scope refuses.
        assert!(matches!(
            store.store.scoped_open(false).unwrap_err(),
            BackendError::StoreClosed
        ));
    }

    #[test]
    fn encoding_is_derived_once() {
        let fmt = demo_format();
        let counters = fmt.counters();
        let store = GridStore::open(fmt, "demo.grd", OpenMode::Read, true).unwrap();
        let opens = counters.opens.load(Ordering::SeqCst);
        let enc = store.encoding();
        assert!(enc.unlimited_dims.contains(&"t".istr()));
        let _ = store.encoding();
        let _ = store.encoding();
        // encoding never goes back to the file
        assert_eq!(counters.opens.load(Ordering::SeqCst), opens);
    }

    #[test]
    fn dataset_from_store_freezes_everything() {
        let store =
            GridStore::open(demo_format(), "demo.grd", OpenMode::Read, false).unwrap();
        let ds = Dataset::from_store(&store).unwrap();
        assert_eq!(ds.variables().len(), 2);
        assert_eq!(ds.dims().get("x"), Some(&4));
        assert_eq!(
            ds.attrs().get("title"),
            Some(&AttrValue::Str("demo file".into()))
        );
        assert!(ds.encoding().unlimited_dims.contains(&"t".istr()));
    }
}
