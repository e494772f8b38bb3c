pub mod heightgrid;
pub mod mesh;
pub mod provider;
pub mod raycast;
pub mod resolver;
pub mod spatial;

pub use heightgrid::*;
pub use mesh::*;
pub use provider::*;
pub use raycast::*;
pub use resolver::*;
