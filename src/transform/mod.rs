pub mod library;
pub mod ops;

pub use library::{library, FuncId, TransformLibrary};
