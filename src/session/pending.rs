// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The pending-attach gate: at most one `ReaderAdd` handshake is
//! outstanding at a time, because the server's `ReaderAddResponse`
//! carries no client-side correlator beyond "the reply to whatever
//! `ReaderAdd` was most recently sent".

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, Notify};

use crate::reader::Reader;

/// One globally-shared pending-attach slot, carried through the event
/// pump and session loop as an explicit value rather than process-wide
/// `static` storage.
#[derive(Default)]
pub struct PendingAttachGate {
    slot: Mutex<Option<Arc<Reader>>>,
    notify: Notify,
}

impl PendingAttachGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks while the gate is not IDLE, then registers `reader` as the
    /// pending one and returns. Holds a reference-counted handle on
    /// `reader` for the duration of the handshake.
    ///
    /// `notified()` is constructed *before* the slot is checked, per
    /// `tokio::sync::Notify`'s documented safe pattern: `notify_waiters`
    /// only wakes `Notified` futures that already existed when it was
    /// called, so building the future after dropping the lock would
    /// leave a window where a concurrent `resolve`/`reject` could fire
    /// between the check and the `.await` and never wake this waiter.
    pub async fn begin_attach(&self, reader: Arc<Reader>) {
        loop {
            let notified = self.notify.notified();
            let mut slot = self.slot.lock().await;
            if slot.is_none() {
                *slot = Some(reader);
                return;
            }
            drop(slot);
            notified.await;
        }
    }

    /// Blocks until the gate is IDLE (no pending attach), without
    /// claiming it. Used by the event pump's stale-event filter to wait
    /// out a handshake on the currently-pending reader.
    ///
    /// Same `notified()`-before-check ordering as [`Self::begin_attach`]
    /// to avoid a missed wakeup.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.notify.notified();
            let slot = self.slot.lock().await;
            if slot.is_none() {
                return;
            }
            drop(slot);
            notified.await;
        }
    }

    /// `ReaderAddResponse` arrived: assign `id` to the pending reader (if
    /// any), clear the slot, and wake every waiter.
    pub async fn resolve(&self, id: u32) -> Option<Arc<Reader>> {
        let mut slot = self.slot.lock().await;
        let reader = slot.take()?;
        reader.set_id(id);
        drop(slot);
        self.notify.notify_waiters();
        Some(reader)
    }

    /// `Error{CANNOT_ADD_MORE_READERS}` arrived: clear the slot without
    /// assigning an id, and wake every waiter.
    pub async fn reject(&self) -> Option<Arc<Reader>> {
        let mut slot = self.slot.lock().await;
        let reader = slot.take()?;
        drop(slot);
        self.notify.notify_waiters();
        Some(reader)
    }

    /// The handle of the currently-pending reader, if any.
    pub async fn pending_handle(&self) -> Option<u64> {
        self.slot.lock().await.as_ref().map(|r| r.handle)
    }

    pub fn is_idle_blocking(&self) -> bool {
        self.slot.try_lock().map(|s| s.is_none()).unwrap_or(false)
    }
}

/// Arms a watchdog that `reject()`s the gate if it is still pending for
/// `reader_handle` after `timeout`, so a host that never replies cannot
/// hang the client forever. The session's default startup path has no
/// explicit timeout and does not arm this, but it is available for
/// deployments that want one.
pub fn arm_timeout_watchdog(gate: Arc<PendingAttachGate>, reader_handle: u64, timeout: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let mut slot = gate.slot.lock().await;
        if slot.as_ref().map(|r| r.handle) == Some(reader_handle) {
            *slot = None;
            drop(slot);
            gate.notify.notify_waiters();
        }
    });
}
