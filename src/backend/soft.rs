// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A minimal in-process stand-in for the real NSS-backed soft-card
//! emulator. It parses the assembled `-e`/`-c` configuration string well
//! enough to create one reader per
//! `soft=(...)` descriptor, answers APDUs with a scriptable echo
//! responder, and generates a synthetic ATR on power-on — enough to run
//! the console and exercise the session loop without a real card stack.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use anyhow::{Result, bail};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::backend::{Backend, BackendOptions, Event, XfrResult};

struct ReaderRecord {
    name: String,
    card_present: AtomicBool,
}

/// Default response returned for any APDU this backend doesn't recognize:
/// ISO 7816 "normal processing, no further qualification".
const SW_OK: [u8; 2] = [0x90, 0x00];

pub struct SoftBackend {
    readers: DashMap<u64, ReaderRecord>,
    events: Mutex<mpsc::UnboundedReceiver<Event>>,
    sender: mpsc::UnboundedSender<Event>,
    next_handle: AtomicU64,
}

impl SoftBackend {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            readers: DashMap::new(),
            events: Mutex::new(receiver),
            sender,
            next_handle: AtomicU64::new(1),
        }
    }

    fn alloc_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }

    /// Extracts reader names from `,soft=(,<name>,<type>,,<certs...>)`
    /// descriptors in the assembled emulator-args string. Falls back to
    /// a single default reader when no descriptor is present.
    fn reader_names_from_args(emul_args: Option<&str>) -> Vec<String> {
        let Some(args) = emul_args else {
            return vec!["Virtual Reader 0".to_string()];
        };
        let mut names = Vec::new();
        for segment in args.split("soft=(").skip(1) {
            let body = segment.split(')').next().unwrap_or("");
            let mut fields = body.split(',');
            let _leading_empty = fields.next();
            if let Some(name) = fields.next().filter(|n| !n.is_empty()) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            names.push("Virtual Reader 0".to_string());
        }
        names
    }
}

impl Default for SoftBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SoftBackend {
    async fn init(&self, options: &BackendOptions) -> Result<()> {
        for name in Self::reader_names_from_args(options.emul_args.as_deref()) {
            let handle = self.alloc_handle();
            self.readers.insert(
                handle,
                ReaderRecord {
                    name: name.clone(),
                    card_present: AtomicBool::new(false),
                },
            );
            // `send` only fails if the receiver has already been dropped,
            // which cannot happen before `init` returns.
            let _ = self.sender.send(Event::ReaderInsert { handle, name });
        }
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
        if !self.readers.contains_key(&handle) {
            bail!("unknown reader handle {handle}");
        }
        // A plausible-looking synthetic ATR; this backend emulates no
        // particular card profile.
        Ok(vec![0x3B, 0x65, 0x00, 0x00, 0x00, 0x00, 0x00])
    }

    async fn reader_xfr(&self, handle: u64, _command: &[u8]) -> Result<XfrResult> {
        if !self.readers.contains_key(&handle) {
            bail!("unknown reader handle {handle}");
        }
        Ok(XfrResult::Ok(SW_OK.to_vec()))
    }

    async fn force_card_insert(&self, handle: u64) -> Result<()> {
        let record = self
            .readers
            .get(&handle)
            .ok_or_else(|| anyhow::anyhow!("unknown reader handle {handle}"))?;
        record.card_present.store(true, Ordering::SeqCst);
        drop(record);
        self.sender
            .send(Event::CardInsert { handle })
            .map_err(|_| anyhow::anyhow!("event queue closed"))
    }

    async fn force_card_remove(&self, handle: u64) -> Result<()> {
        let record = self
            .readers
            .get(&handle)
            .ok_or_else(|| anyhow::anyhow!("unknown reader handle {handle}"))?;
        record.card_present.store(false, Ordering::SeqCst);
        drop(record);
        self.sender
            .send(Event::CardRemove { handle })
            .map_err(|_| anyhow::anyhow!("event queue closed"))
    }
}

/// Convenience constructor used by `main` and the console: wraps the
/// backend in the `Arc` the session core expects.
pub fn new_shared() -> Arc<SoftBackend> {
    Arc::new(SoftBackend::new())
}
