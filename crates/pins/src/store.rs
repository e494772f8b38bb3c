use std::fmt;

use async_trait::async_trait;

use crate::pin::{NewPin, Pin, PinId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinStoreError {
    /// Transport failure or the backend reported an internal error.
    Unavailable(String),
    NotFound(PinId),
    /// The backend refused the payload (e.g. validation).
    Rejected(String),
    /// The backend answered with something that is not a pin document.
    Decode(String),
    /// The call did not finish within the caller's deadline.
    Timeout,
}

impl fmt::Display for PinStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinStoreError::Unavailable(msg) => write!(f, "pin store unavailable: {msg}"),
            PinStoreError::NotFound(id) => write!(f, "pin {id} not found"),
            PinStoreError::Rejected(msg) => write!(f, "pin store rejected request: {msg}"),
            PinStoreError::Decode(msg) => write!(f, "unexpected pin store response: {msg}"),
            PinStoreError::Timeout => write!(f, "pin store did not respond in time"),
        }
    }
}

impl std::error::Error for PinStoreError {}

/// Opaque CRUD collection of pins keyed by id.
///
/// No update operation exists: relabeling is delete + create.
#[async_trait]
pub trait PinStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Pin>, PinStoreError>;
    async fn create(&self, pin: NewPin) -> Result<Pin, PinStoreError>;
    async fn delete(&self, id: &PinId) -> Result<(), PinStoreError>;
}
