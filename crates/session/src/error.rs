use std::fmt;

use foundation::math::{ProjectionError, Vec3};
use pins::PinStoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The terrain mesh is not loaded yet, or failed to load.
    NotLoaded,
    /// The reference frame or the clicked coordinate cannot be projected.
    Configuration(ProjectionError),
    /// A picked model point has a NaN or infinite coordinate.
    InvalidPoint(Vec3),
    /// No candidate is being edited.
    NoSelection,
    /// The label is empty after trimming.
    EmptyLabel,
    /// The candidate is already being saved.
    Busy,
    /// A newer click or a cancel replaced this operation's selection.
    Superseded,
    /// The terrain query task failed.
    Resolve(String),
    Persistence(PinStoreError),
    MeshLoad(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotLoaded => write!(f, "the 3D model is still loading"),
            SessionError::Configuration(e) => write!(f, "cannot place coordinate: {e}"),
            SessionError::InvalidPoint(p) => {
                write!(f, "invalid model point ({}, {}, {})", p.x, p.y, p.z)
            }
            SessionError::NoSelection => write!(f, "no location selected"),
            SessionError::EmptyLabel => write!(f, "a pin label is required"),
            SessionError::Busy => write!(f, "the selected location is being saved"),
            SessionError::Superseded => write!(f, "selection was replaced"),
            SessionError::Resolve(msg) => write!(f, "terrain query failed: {msg}"),
            SessionError::Persistence(e) => write!(f, "{e}"),
            SessionError::MeshLoad(msg) => write!(f, "failed to load the 3D model: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Configuration(e) => Some(e),
            SessionError::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProjectionError> for SessionError {
    fn from(e: ProjectionError) -> Self {
        SessionError::Configuration(e)
    }
}

impl From<PinStoreError> for SessionError {
    fn from(e: PinStoreError) -> Self {
        SessionError::Persistence(e)
    }
}
