//! Indexing-expression classification, lazy composition, and the lazy array
//! wrapper.
//!
//! Raw user expressions (`IndexExpr`) are classified against a target shape
//! into exactly one canonical [`Indexer`] kind; canonical indexers compose
//! with each other without touching storage; [`LazyArray`] accumulates the
//! composition and performs a single backend read on materialization.

pub mod classify;
pub mod compose;
pub mod expr;
pub mod indexer;
pub mod lazy;

pub use classify::classify;
pub use compose::compose;
pub use expr::{IndexArray, IndexElem, IndexExpr, Slice};
pub use indexer::{BasicTerm, CSlice, IndexKind, Indexer, OuterTerm, VectorizedIndexer};
pub use lazy::LazyArray;
