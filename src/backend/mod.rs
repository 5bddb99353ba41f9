// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The backend facade: a narrow interface between the session core and
//! the card emulation layer. Real backends (NSS-based soft cards, PC/SC
//! passthrough) are treated as external collaborators; this crate ships
//! [`soft::SoftBackend`] as a minimal in-process stand-in sufficient to
//! drive the daemon end to end, and [`mock::MockBackend`] as a fully
//! scriptable backend for tests.
//!
//! The session loop and event pump are generic over this trait rather
//! than holding a trait object: the choice of backend is resolved once
//! at startup (`-p` vs. the default emulator) and never changes for the
//! life of the process, so there is no need to pay for dynamic dispatch
//! or give up `async fn` ergonomics in the trait.

pub mod mock;
pub mod soft;

use std::future::Future;

use anyhow::Result;

/// A local backend event, carrying the backend handle of the reader it
/// concerns.
#[derive(Debug, Clone)]
pub enum Event {
    ReaderInsert { handle: u64, name: String },
    ReaderRemove { handle: u64 },
    CardInsert { handle: u64 },
    CardRemove { handle: u64 },
}

impl Event {
    pub fn handle(&self) -> u64 {
        match self {
            Event::ReaderInsert { handle, .. }
            | Event::ReaderRemove { handle }
            | Event::CardInsert { handle }
            | Event::CardRemove { handle } => *handle,
        }
    }
}

/// Result of a card transfer: either success, carrying the response
/// APDU, or a backend status forwarded to the host as an `Error`.
#[derive(Debug, Clone)]
pub enum XfrResult {
    Ok(Vec<u8>),
    Error(u32),
}

/// Pass-through configuration string plus certificate nicknames, as
/// assembled by [`crate::cfg::config::ClientConfig`] from the `-e`/`-c`
/// CLI flags.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub emul_args: Option<String>,
}

/// Narrow interface the core consumes. Implementors own the
/// [`crate::reader::Reader`] lifecycle only insofar as they decide when
/// to emit `ReaderInsert`/`ReaderRemove`; the session core owns the
/// [`crate::reader::ReaderRegistry`] that tracks server-assigned ids.
pub trait Backend: Send + Sync + 'static {
    fn init(&self, options: &BackendOptions) -> impl Future<Output = Result<()>> + Send;

    fn shutdown(&self) -> impl Future<Output = ()> + Send;

    /// Blocks until the next event; `None` signals shutdown.
    fn event_wait(&self) -> impl Future<Output = Option<Event>> + Send;

    /// Human-readable name for a reader handle, used for `ReaderAdd`.
    fn reader_name(&self, handle: u64) -> impl Future<Output = Option<String>> + Send;

    /// Powers the reader on and returns its ATR.
    fn reader_power_on(&self, handle: u64) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Executes a command APDU against the card in `handle`.
    fn reader_xfr(
        &self,
        handle: u64,
        command: &[u8],
    ) -> impl Future<Output = Result<XfrResult>> + Send;

    /// Interactive-console hook: force a card insertion.
    fn force_card_insert(&self, handle: u64) -> impl Future<Output = Result<()>> + Send;

    /// Interactive-console hook: force a card removal.
    fn force_card_remove(&self, handle: u64) -> impl Future<Output = Result<()>> + Send;
}
