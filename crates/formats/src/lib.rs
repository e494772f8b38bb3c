pub mod document;
pub mod file;
pub mod obj;

pub use document::*;
pub use file::*;
pub use obj::*;
