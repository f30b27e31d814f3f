//! Write serialization across stores.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Serializes every mutation that reads more than one store.
///
/// Posting reads the chart and the fiscal calendar, then appends to the
/// entry store; closing a period reads the entry store, then flips the
/// calendar. Holding the gate across each keeps those read-then-write
/// sequences from interleaving. Clones share the same lock.
#[derive(Debug, Clone, Default)]
pub struct WriteGate {
    lock: Arc<Mutex<()>>,
}

impl WriteGate {
    /// Creates a new, unshared gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the gate is free and holds it until the guard drops.
    pub fn enter(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }
}
