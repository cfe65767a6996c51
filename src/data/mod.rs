mod array;
mod buffer;

pub use array::ArrayData;
pub use buffer::{DataBuffer, DataType, Scalar};
