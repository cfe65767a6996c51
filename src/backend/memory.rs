//! Reference in-memory backend with full indexing capabilities.
//!
//! This is the adapter other backends are tested against: every canonical
//! kind is serviced by direct gathers on a row-major buffer.

use crate::backend::{ensure_supported, IndexSupport, IndexableArray};
use crate::data::{ArrayData, DataType};
use crate::errors::BackendResult;
use crate::indexing::{Indexer, OuterTerm, VectorizedIndexer};
use crate::shape::{element_count, for_each_index, strides_row_major, Shape};

/// An already-loaded array exposed through the backend contract.
#[derive(Debug, Clone)]
pub struct InMemoryArray {
    data: ArrayData,
}

impl InMemoryArray {
    pub fn new(data: ArrayData) -> InMemoryArray {
        InMemoryArray { data }
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }
}

impl IndexableArray for InMemoryArray {
    fn shape(&self) -> &[u64] {
        self.data.shape()
    }

    fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    fn capabilities(&self) -> IndexSupport {
        IndexSupport::all()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, key: &Indexer) -> BackendResult<ArrayData> {
        ensure_supported(self.capabilities(), key, self.backend_name())?;
        Ok(match key {
            Indexer::Basic(terms) => {
                let outer: Vec<OuterTerm> =
                    terms.iter().cloned().map(OuterTerm::from).collect();
                gather_outer(&self.data, &outer)
            }
            Indexer::Outer(terms) => gather_outer(&self.data, terms),
            Indexer::Vectorized(v) => gather_joint(&self.data, v),
        })
    }
}

/// Cartesian gather: per-axis selections are independent, integer axes are
/// folded into a base offset and dropped from the result.
fn gather_outer(data: &ArrayData, terms: &[OuterTerm]) -> ArrayData {
    let strides = strides_row_major(data.shape());

    let mut base = 0u64;
    let mut kept: Vec<Vec<u64>> = Vec::new();
    let mut out_shape: Shape = Shape::new();
    for (axis, term) in terms.iter().enumerate() {
        let stride = strides[axis];
        match term {
            OuterTerm::Index(i) => base += i * stride,
            OuterTerm::Slice(s) => {
                kept.push(s.iter().map(|i| i * stride).collect());
                out_shape.push(s.len);
            }
            OuterTerm::Array(a) => {
                kept.push(a.iter().map(|&i| i * stride).collect());
                out_shape.push(a.len() as u64);
            }
        }
    }

    let mut flats = Vec::with_capacity(element_count(&out_shape) as usize);
    for_each_index(&out_shape, |ix| {
        let flat = base
            + kept
                .iter()
                .zip(ix.iter())
                .map(|(offsets, &i)| offsets[i as usize])
                .sum::<u64>();
        flats.push(flat as usize);
    });
    ArrayData::new(out_shape, data.buffer().take_indices(&flats))
}

/// Joint gather: every output position names one coordinate per axis.
fn gather_joint(data: &ArrayData, v: &VectorizedIndexer) -> ArrayData {
    let strides = strides_row_major(data.shape());
    let out_shape: Shape = v.shape().iter().copied().collect();

    let mut flats = Vec::with_capacity(element_count(&out_shape) as usize);
    for_each_index(&out_shape, |ix| {
        let flat: u64 = v
            .arrays()
            .iter()
            .zip(strides.iter())
            .map(|(a, &stride)| a.get_broadcast(ix) as u64 * stride)
            .sum();
        flats.push(flat as usize);
    });
    ArrayData::new(out_shape, data.buffer().take_indices(&flats))
}
