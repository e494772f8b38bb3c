use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use pins::{MemoryPinStore, NewPin, Pin, PinId, PinStore, PinStoreError};
use tokio::sync::oneshot;

/// Memory store with switchable failures and gates that hold calls open.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    inner: MemoryPinStore,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_list: AtomicBool,
    create_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    list_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    list_calls: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryPinStore {
        &self.inner
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// The next `create` waits until the returned sender fires.
    pub fn gate_create(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.create_gates.lock().push_back(rx);
        tx
    }

    /// The next `list` snapshots the pins, then waits for the sender.
    pub fn gate_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.list_gates.lock().push_back(rx);
        tx
    }
}

fn down() -> PinStoreError {
    PinStoreError::Unavailable("backend down".to_string())
}

#[async_trait]
impl PinStore for ScriptedStore {
    async fn list(&self) -> Result<Vec<Pin>, PinStoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.inner.list().await;
        let gate = self.list_gates.lock().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(down());
        }
        snapshot
    }

    async fn create(&self, pin: NewPin) -> Result<Pin, PinStoreError> {
        let gate = self.create_gates.lock().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(down());
        }
        self.inner.create(pin).await
    }

    async fn delete(&self, id: &PinId) -> Result<(), PinStoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(down());
        }
        self.inner.delete(id).await
    }
}
