use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::pin::{NewPin, Pin, PinId};
use crate::store::{PinStore, PinStoreError};

/// In-process pin store. Lists in creation order.
#[derive(Debug, Default)]
pub struct MemoryPinStore {
    pins: Mutex<Vec<Pin>>,
}

impl MemoryPinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pins(pins: Vec<Pin>) -> Self {
        Self {
            pins: Mutex::new(pins),
        }
    }

    pub fn len(&self) -> usize {
        self.pins.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PinStore for MemoryPinStore {
    async fn list(&self) -> Result<Vec<Pin>, PinStoreError> {
        Ok(self.pins.lock().clone())
    }

    async fn create(&self, pin: NewPin) -> Result<Pin, PinStoreError> {
        if pin.label.trim().is_empty() {
            return Err(PinStoreError::Rejected("label is required".to_string()));
        }
        if !pin.position.is_finite() {
            return Err(PinStoreError::Rejected(
                "position must be three finite numbers".to_string(),
            ));
        }
        let pin = pin.into_pin(PinId::new(Uuid::new_v4().to_string()));
        self.pins.lock().push(pin.clone());
        Ok(pin)
    }

    async fn delete(&self, id: &PinId) -> Result<(), PinStoreError> {
        let mut pins = self.pins.lock();
        let Some(idx) = pins.iter().position(|p| &p.id == id) else {
            return Err(PinStoreError::NotFound(id.clone()));
        };
        pins.remove(idx);
        Ok(())
    }
}
