pub mod http;
pub mod memory;
pub mod pin;
pub mod store;

pub use http::*;
pub use memory::*;
pub use pin::*;
pub use store::*;
