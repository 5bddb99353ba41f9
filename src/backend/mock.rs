// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A fully scriptable [`Backend`] used by the event-pump and session-loop
//! tests to drive exact event sequences — races, rejects, reconnects —
//! deterministically, without timing-dependent sleeps. Not behind
//! `#[cfg(test)]`: the integration suite under `tests/` is a separate
//! crate and can only reach `pub` items of this library.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};

use crate::backend::{Backend, BackendOptions, Event, XfrResult};

#[derive(Debug, Clone, Default)]
struct ScriptedReader {
    name: String,
    xfr_response: Option<XfrResult>,
}

pub struct MockBackend {
    events: Mutex<mpsc::UnboundedReceiver<Event>>,
    event_tx: mpsc::UnboundedSender<Event>,
    readers: DashMap<u64, ScriptedReader>,
    init_options: Mutex<Option<BackendOptions>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        let (event_tx, events) = mpsc::unbounded_channel();
        Arc::new(Self {
            events: Mutex::new(events),
            event_tx,
            readers: DashMap::new(),
            init_options: Mutex::new(None),
        })
    }

    /// Registers a reader the mock knows about, without emitting an event.
    pub fn register_reader(&self, handle: u64, name: impl Into<String>) {
        self.readers.insert(
            handle,
            ScriptedReader {
                name: name.into(),
                xfr_response: None,
            },
        );
    }

    /// Script the response `reader_xfr` returns for `handle`.
    pub fn set_xfr_response(&self, handle: u64, result: XfrResult) {
        self.readers
            .entry(handle)
            .or_default()
            .xfr_response = Some(result);
    }

    /// Push an event into the queue the event pump consumes.
    pub fn push_event(&self, event: Event) {
        // A closed receiver only happens after `shutdown`, which tests
        // that call `push_event` afterwards would do deliberately wrong.
        let _ = self.event_tx.send(event);
    }

    /// Close the event queue, causing `event_wait` to return `None` once
    /// drained.
    pub async fn close(&self) {
        self.events.lock().await.close();
    }

    pub async fn init_options(&self) -> Option<BackendOptions> {
        self.init_options.lock().await.clone()
    }
}

impl Backend for MockBackend {
    async fn init(&self, options: &BackendOptions) -> Result<()> {
        *self.init_options.lock().await = Some(options.clone());
        Ok(())
    }

    async fn shutdown(&self) {
        self.events.lock().await.close();
    }

    async fn event_wait(&self) -> Option<Event> {
        self.events.lock().await.recv().await
    }

    async fn reader_name(&self, handle: u64) -> Option<String> {
        self.readers.get(&handle).map(|r| r.name.clone())
    }

    async fn reader_power_on(&self, handle: u64) -> Result<Vec<u8>> {
        self.readers
            .get(&handle)
            .map(|_| vec![0x3B, 0x00])
            .ok_or_else(|| anyhow!("unknown reader handle {handle}"))
    }

    async fn reader_xfr(&self, handle: u64, _command: &[u8]) -> Result<XfrResult> {
        let scripted = self
            .readers
            .get(&handle)
            .ok_or_else(|| anyhow!("unknown reader handle {handle}"))?;
        Ok(scripted
            .xfr_response
            .clone()
            .unwrap_or_else(|| XfrResult::Ok(vec![0x90, 0x00])))
    }

    async fn force_card_insert(&self, handle: u64) -> Result<()> {
        self.push_event(Event::CardInsert { handle });
        Ok(())
    }

    async fn force_card_remove(&self, handle: u64) -> Result<()> {
        self.push_event(Event::CardRemove { handle });
        Ok(())
    }
}
