pub mod config;
pub mod error;
pub mod notice;
pub mod selection;
pub mod session;

#[cfg(test)]
mod test_support;

pub use config::*;
pub use error::*;
pub use notice::*;
pub use selection::*;
pub use session::*;
