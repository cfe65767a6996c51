mod handle;

pub use handle::{StoreHandle, StoreOpener, StoreScope};
