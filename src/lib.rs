//! Lazy indexing core for gridded-data backends.
//!
//! The crate wraps not-yet-loaded on-disk arrays behind indexable handles,
//! composes successive indexing operations without touching storage,
//! classifies raw indexing expressions into the small canonical set backends
//! must support, and guards the open/close lifecycle of the underlying
//! storage handle (including transient autoclose reopens).

use std::sync::Arc;

pub mod backend;
pub mod data;
pub mod errors;
pub mod indexing;
pub mod model;
pub mod shape;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{DynIndexableArray, IndexSupport, IndexableArray};
pub use data::{ArrayData, DataBuffer, DataType, Scalar};
pub use errors::{BackendError, BackendResult, IndexError, IndexResult};
pub use indexing::{IndexExpr, IndexKind, Indexer, LazyArray};
pub use model::{Dataset, Encoding, Frozen, Variable};
pub use store::{StoreHandle, StoreOpener, StoreScope};

/// Shared immutable name type for variables and dimensions.
pub type IStr = Arc<str>;

/// Extension trait for converting borrowed strings into [`IStr`].
pub trait IntoIStr {
    fn istr(&self) -> IStr;
}

impl IntoIStr for str {
    fn istr(&self) -> IStr {
        Arc::from(self)
    }
}

impl IntoIStr for String {
    fn istr(&self) -> IStr {
        Arc::from(self.as_str())
    }
}
