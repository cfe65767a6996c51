//! Test doubles shared across the crate's test modules.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::backend::format::{
    AttrMap, AttrValue, FormatHandle, FormatLibrary, FormatVariable, OpenMode,
};
use crate::backend::memory::InMemoryArray;
use crate::backend::{IndexSupport, IndexableArray};
use crate::data::{ArrayData, DataBuffer, DataType, Scalar};
use crate::errors::backend::VariableNotFoundSnafu;
use crate::errors::BackendResult;
use crate::indexing::{BasicTerm, Indexer};
use crate::shape::Shape;
use crate::store::StoreOpener;
use crate::{IStr, IntoIStr};

// ---------------------------------------------------------------------------
// Store guard doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct OpenCountersInner {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

/// Shared open/close counters observed by guard tests.
#[derive(Clone, Default)]
pub(crate) struct OpenCounters(Arc<OpenCountersInner>);

impl std::ops::Deref for OpenCounters {
    type Target = OpenCountersInner;

    fn deref(&self) -> &OpenCountersInner {
        &self.0
    }
}

pub(crate) struct MockOpener {
    counters: OpenCounters,
}

impl MockOpener {
    pub fn new(counters: &OpenCounters) -> MockOpener {
        MockOpener { counters: counters.clone() }
    }
}

pub(crate) struct MockHandle {
    counters: OpenCounters,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl StoreOpener for MockOpener {
    type Handle = MockHandle;

    fn open(&self) -> BackendResult<MockHandle> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MockHandle { counters: self.counters.clone() })
    }
}

// ---------------------------------------------------------------------------
// Read-counting backend array
// ---------------------------------------------------------------------------

/// An in-memory array that counts how often `read` is called; the I/O-free
/// property of lazy indexing is asserted against this counter.
pub(crate) struct CountingArray {
    inner: InMemoryArray,
    reads: Arc<AtomicUsize>,
}

impl CountingArray {
    /// `0..n` laid out row-major over `shape`.
    pub fn over_range(n: i64, shape: &[u64]) -> CountingArray {
        CountingArray {
            inner: InMemoryArray::new(ArrayData::new(shape, DataBuffer::I64((0..n).collect()))),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn reads(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }
}

impl IndexableArray for CountingArray {
    fn shape(&self) -> &[u64] {
        self.inner.shape()
    }
    fn dtype(&self) -> DataType {
        self.inner.dtype()
    }
    fn capabilities(&self) -> IndexSupport {
        self.inner.capabilities()
    }
    fn backend_name(&self) -> &'static str {
        "counting-memory"
    }
    fn read(&self, key: &Indexer) -> BackendResult<ArrayData> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(key)
    }
}

// ---------------------------------------------------------------------------
// In-memory format library
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct FormatCounters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub masking_disabled: AtomicUsize,
    pub block_reads: Arc<AtomicUsize>,
}

struct MemoryVarSpec {
    dims: SmallVec<[IStr; 4]>,
    data: ArrayData,
    attrs: AttrMap,
}

#[derive(Default)]
pub(crate) struct MemoryFormatInner {
    vars: BTreeMap<IStr, MemoryVarSpec>,
    attrs: AttrMap,
    dims: Vec<(IStr, u64)>,
    unlimited: BTreeSet<IStr>,
    counters: FormatCounters,
}

/// An entirely in-memory "file format": one file description served through
/// the [`FormatLibrary`] boundary, with open/close/masking/read counters.
#[derive(Clone, Default)]
pub(crate) struct MemoryFormat {
    inner: Arc<MemoryFormatInner>,
}

impl MemoryFormat {
    pub fn new() -> MemoryFormat {
        MemoryFormat::default()
    }

    fn inner_mut(&mut self) -> &mut MemoryFormatInner {
        Arc::get_mut(&mut self.inner).expect("builder used before sharing")
    }

    pub fn with_dim(mut self, name: &str, size: u64, unlimited: bool) -> MemoryFormat {
        let inner = self.inner_mut();
        inner.dims.push((name.istr(), size));
        if unlimited {
            inner.unlimited.insert(name.istr());
        }
        self
    }

    pub fn with_var(mut self, name: &str, dims: &[&str], data: ArrayData) -> MemoryFormat {
        let spec = MemoryVarSpec {
            dims: dims.iter().map(|d| d.istr()).collect(),
            data,
            attrs: AttrMap::new(),
        };
        self.inner_mut().vars.insert(name.istr(), spec);
        self
    }

    pub fn with_attr(mut self, name: &str, value: AttrValue) -> MemoryFormat {
        self.inner_mut().attrs.insert(name.istr(), value);
        self
    }

    pub fn counters(&self) -> Arc<MemoryFormatInner> {
        self.inner.clone()
    }
}

impl std::ops::Deref for MemoryFormatInner {
    type Target = FormatCounters;

    fn deref(&self) -> &FormatCounters {
        &self.counters
    }
}

impl FormatLibrary for MemoryFormat {
    type Handle = MemoryFormatHandle;

    fn name(&self) -> &'static str {
        "memtest"
    }

    fn open(&self, _path: &Path, _mode: OpenMode) -> BackendResult<MemoryFormatHandle> {
        self.inner.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryFormatHandle { inner: self.inner.clone() })
    }
}

pub(crate) struct MemoryFormatHandle {
    inner: Arc<MemoryFormatInner>,
}

impl Drop for MemoryFormatHandle {
    fn drop(&mut self) {
        self.inner.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl FormatHandle for MemoryFormatHandle {
    type Variable = MemoryFormatVariable;

    fn disable_auto_masking(&self) {
        self.inner
            .counters
            .masking_disabled
            .fetch_add(1, Ordering::SeqCst);
    }

    fn variable_names(&self) -> Vec<IStr> {
        self.inner.vars.keys().cloned().collect()
    }

    fn variable(&self, name: &str) -> BackendResult<MemoryFormatVariable> {
        if !self.inner.vars.contains_key(name) {
            return VariableNotFoundSnafu { name: name.istr() }.fail();
        }
        Ok(MemoryFormatVariable {
            inner: self.inner.clone(),
            name: name.istr(),
        })
    }

    fn attrs(&self) -> AttrMap {
        self.inner.attrs.clone()
    }

    fn dimensions(&self) -> Vec<(IStr, u64)> {
        self.inner.dims.clone()
    }

    fn is_unlimited(&self, dim: &str) -> bool {
        self.inner.unlimited.contains(dim)
    }
}

pub(crate) struct MemoryFormatVariable {
    inner: Arc<MemoryFormatInner>,
    name: IStr,
}

impl MemoryFormatVariable {
    fn spec(&self) -> &MemoryVarSpec {
        &self.inner.vars[&self.name]
    }
}

impl FormatVariable for MemoryFormatVariable {
    fn dims(&self) -> SmallVec<[IStr; 4]> {
        self.spec().dims.clone()
    }

    fn shape(&self) -> Shape {
        self.spec().data.shape().iter().copied().collect()
    }

    fn dtype(&self) -> DataType {
        self.spec().data.dtype()
    }

    fn attrs(&self) -> AttrMap {
        self.spec().attrs.clone()
    }

    fn read_block(&self, key: &[BasicTerm]) -> BackendResult<ArrayData> {
        self.inner
            .counters
            .block_reads
            .fetch_add(1, Ordering::SeqCst);
        let indexer = Indexer::Basic(key.iter().cloned().collect());
        InMemoryArray::new(self.spec().data.clone()).read(&indexer)
    }

    fn get_value(&self) -> BackendResult<Scalar> {
        self.spec().data.clone().into_scalar()
    }
}
