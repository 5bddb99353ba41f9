// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The local reader/card data model and the reader registry that maps
//! backend handles to server-assigned ids.

pub mod registry;

use std::sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
};

use crate::{error::VscError, wire::UNDEFINED_READER_ID};

pub use registry::ReaderRegistry;

/// Per-reader card presence state: set by card-insert (which must be
/// accompanied by powering the reader on to obtain the ATR) and cleared
/// by card-remove.
#[derive(Debug, Clone, Default)]
pub struct CardState {
    pub present: bool,
    pub atr: Option<Vec<u8>>,
}

/// A logical reader slot that may or may not contain a card.
///
/// Always handled behind `Arc<Reader>`: the backend owns the object, and
/// the core holds a reference-counted handle while an event or handshake
/// is in flight (the pending-attach slot in particular).
#[derive(Debug)]
pub struct Reader {
    /// Backend-local opaque handle, stable for the reader's lifetime.
    pub handle: u64,
    pub name: String,
    id: AtomicU32,
    card: Mutex<CardState>,
}

impl Reader {
    pub fn new(handle: u64, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            id: AtomicU32::new(UNDEFINED_READER_ID),
            card: Mutex::new(CardState::default()),
        }
    }

    /// Current server-assigned id, or `UNDEFINED_READER_ID` if unassigned.
    pub fn id(&self) -> u32 {
        self.id.load(Ordering::SeqCst)
    }

    pub fn is_assigned(&self) -> bool {
        self.id() != UNDEFINED_READER_ID
    }

    pub(crate) fn set_id(&self, id: u32) {
        self.id.store(id, Ordering::SeqCst);
    }

    pub(crate) fn clear_id(&self) {
        self.id.store(UNDEFINED_READER_ID, Ordering::SeqCst);
    }

    /// Record a card insertion. `atr` must be at most
    /// [`crate::wire::MAX_ATR_LEN`] bytes; a longer ATR is a backend
    /// error, not a codec-level failure.
    pub fn insert_card(&self, atr: Vec<u8>) -> Result<(), VscError> {
        if atr.len() > crate::wire::MAX_ATR_LEN {
            return Err(VscError::Truncated {
                expected: crate::wire::MAX_ATR_LEN,
                got: atr.len(),
            });
        }
        let mut card = self.card.lock().expect("reader card mutex poisoned");
        card.present = true;
        card.atr = Some(atr);
        Ok(())
    }

    pub fn remove_card(&self) {
        let mut card = self.card.lock().expect("reader card mutex poisoned");
        card.present = false;
        card.atr = None;
    }

    pub fn card_state(&self) -> CardState {
        self.card.lock().expect("reader card mutex poisoned").clone()
    }
}
