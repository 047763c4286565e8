//! Link serializer: one transaction in flight per display and per bus.
//!
//! # Why two gates? (for beginners)
//!
//! A monitor's DDC/CI processor is slow and stateful.  If two threads talk to
//! the same monitor at once, the replies get mixed up.  Worse, several
//! monitors can share one physical bus controller, so even transactions for
//! *different* monitors may collide on the wire.
//!
//! Every transaction therefore holds two gates at once:
//!
//! ```text
//!   acquire display gate  ──►  acquire bus gate  ──►  transport call
//!                                                          │
//!   release display gate  ◄──  release bus gate  ◄──  (settle delay)
//! ```
//!
//! Gates are always taken display first, bus second, so two callers can never
//! each hold the gate the other is waiting for.
//!
//! # Settle delay
//!
//! After a write the monitor needs time to apply the change before it can
//! accept the next command.  A [`LinkLease`] dropped with a non-zero settle
//! delay hands its gates to a short-lived `ddc-settle` thread that releases
//! them once the delay has elapsed.  The caller returns immediately; the
//! next caller on the same link blocks until the release happens.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::infrastructure::locator::DisplayId;
use crate::infrastructure::transport::BusHandle;

/// Identifies one gate in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKey {
    Display(DisplayId),
    Bus(BusHandle),
}

/// A binary semaphore that is not tied to a guard's lifetime, so it can be
/// released from another thread.
#[derive(Default)]
struct Gate {
    held: Mutex<bool>,
    freed: Condvar,
}

impl Gate {
    fn acquire(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while *held {
            held = self
                .freed
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
    }

    fn release(&self) {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.freed.notify_one();
    }

    fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-lifetime registry of display and bus gates.
///
/// Gates are created on first use and never removed; the set is bounded by
/// the attached hardware.  The map itself sits behind its own lock so that
/// two callers racing on a new key always end up with the same gate.
#[derive(Default)]
pub struct LinkRegistry {
    gates: Mutex<HashMap<GateKey, Arc<Gate>>>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every link that was not given its own.
    pub fn global() -> Arc<LinkRegistry> {
        static GLOBAL: OnceLock<Arc<LinkRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(LinkRegistry::new())))
    }

    fn gate(&self, key: GateKey) -> Arc<Gate> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(key).or_default())
    }

    /// Blocks until the gate for `key` is free, then holds it.
    pub fn acquire(&self, key: GateKey) {
        self.gate(key).acquire();
    }

    /// Releases the gate for `key`, after `settle` when it is non-zero.
    ///
    /// Never blocks the caller for the settle delay.
    pub fn release(&self, key: GateKey, settle: Duration) {
        release_after(vec![self.gate(key)], settle);
    }

    /// Whether some transaction (or a pending settle) currently holds `key`.
    pub fn is_held(&self, key: GateKey) -> bool {
        self.gate(key).is_held()
    }

    /// Number of gates created so far.
    pub fn gate_count(&self) -> usize {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Acquires the display gate and then the bus gate.
    ///
    /// Both are released when the returned lease is dropped, on success and
    /// failure paths alike.
    pub fn lease(self: &Arc<Self>, display: DisplayId, bus: BusHandle) -> LinkLease {
        let display_gate = self.gate(GateKey::Display(display));
        let bus_gate = self.gate(GateKey::Bus(bus));
        display_gate.acquire();
        bus_gate.acquire();

        LinkLease {
            gates: vec![bus_gate, display_gate],
            settle: Duration::ZERO,
        }
    }
}

/// Exclusive access to one display link and its bus.
#[must_use = "the link is released as soon as the lease is dropped"]
pub struct LinkLease {
    /// Release order: bus first, display second.
    gates: Vec<Arc<Gate>>,
    settle: Duration,
}

impl LinkLease {
    /// Keeps the link held for `settle` after the lease is dropped.
    pub fn settle_after(&mut self, settle: Duration) {
        self.settle = settle;
    }
}

impl Drop for LinkLease {
    fn drop(&mut self) {
        release_after(std::mem::take(&mut self.gates), self.settle);
    }
}

fn release_after(gates: Vec<Arc<Gate>>, settle: Duration) {
    if settle.is_zero() {
        gates.iter().for_each(|gate| gate.release());
        return;
    }

    let deferred = gates.clone();
    let spawned = thread::Builder::new()
        .name("ddc-settle".to_string())
        .spawn(move || {
            thread::sleep(settle);
            deferred.iter().for_each(|gate| gate.release());
        });

    if let Err(e) = spawned {
        warn!(
            settle_ms = settle.as_millis() as u64,
            "could not spawn settle thread, settling inline: {e}"
        );
        thread::sleep(settle);
        gates.iter().for_each(|gate| gate.release());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
