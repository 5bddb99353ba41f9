// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use dashmap::DashMap;

use crate::{reader::Reader, wire::UNDEFINED_READER_ID};

/// Maps backend-local reader handles to `Arc<Reader>`, plus a secondary
/// index from server-assigned `reader_id` to handle for O(1) `by_id`
/// lookups. Both maps are kept consistent by `assign`/`clear`: a
/// successful `assign` is visible to every subsequent `by_id` lookup
/// across threads.
#[derive(Debug, Default)]
pub struct ReaderRegistry {
    by_handle: DashMap<u64, Arc<Reader>>,
    by_id: DashMap<u32, u64>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly observed backend reader (e.g. on `READER_INSERT`).
    pub fn insert(&self, reader: Arc<Reader>) {
        self.by_handle.insert(reader.handle, reader);
    }

    /// Drop a reader entirely (e.g. on `READER_REMOVE`).
    pub fn remove(&self, handle: u64) -> Option<Arc<Reader>> {
        let removed = self.by_handle.remove(&handle).map(|(_, r)| r);
        if let Some(reader) = &removed {
            self.by_id.remove(&reader.id());
        }
        removed
    }

    pub fn by_handle(&self, handle: u64) -> Option<Arc<Reader>> {
        self.by_handle.get(&handle).map(|r| Arc::clone(&r))
    }

    /// Lookup by server id; `None` if unassigned or unknown.
    pub fn by_id(&self, reader_id: u32) -> Option<Arc<Reader>> {
        if reader_id == UNDEFINED_READER_ID {
            return None;
        }
        let handle = *self.by_id.get(&reader_id)?;
        self.by_handle(handle)
    }

    /// Assign `id` to `reader`, becoming visible to `by_id` immediately.
    pub fn assign(&self, reader: &Arc<Reader>, id: u32) {
        reader.set_id(id);
        self.by_id.insert(id, reader.handle);
    }

    /// Clear a reader's id (rejection or removal), dropping the `by_id` entry.
    pub fn clear(&self, reader: &Arc<Reader>) {
        self.by_id.remove(&reader.id());
        reader.clear_id();
    }

    /// Snapshot of all known readers.
    pub fn list(&self) -> Vec<Arc<Reader>> {
        self.by_handle.iter().map(|r| Arc::clone(r.value())).collect()
    }
}
