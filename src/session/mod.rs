// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Ties the wire codec, reader registry, pending-attach gate, event pump
//! and session loop together into one running client.

pub mod console;
pub mod event_pump;
pub mod pending;
pub mod send_gate;
pub mod session_loop;

use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{error, info};

pub use pending::PendingAttachGate;
pub use send_gate::SendGate;

use crate::{
    backend::{Backend, BackendOptions},
    error::{ExitCode, SessionError},
    reader::ReaderRegistry,
    wire::{MINIMAL_READER_ID, MessageType},
};

/// Connects to `(host, port)`, runs the startup sequence, spawns the
/// event pump (and, if `console` is set, the interactive console) as
/// independent tasks, and drives the session loop until a fatal error.
/// Returns the process exit code `main` should use.
pub async fn run<B: Backend>(
    backend: Arc<B>,
    options: BackendOptions,
    host: String,
    port: u16,
    console: bool,
) -> ExitCode {
    let stream = match TcpStream::connect((host.as_str(), port)).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("connect to {host}:{port} failed: {e}");
            return ExitCode::ConnectFailure;
        }
    };
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();

    let registry = Arc::new(ReaderRegistry::new());
    let gate = Arc::new(PendingAttachGate::new());
    let send_gate = Arc::new(SendGate::new(write_half));

    // Drop any stale reader left over from an unclean previous exit,
    // before the backend can emit its own READER_INSERT events.
    if let Err(e) = send_gate
        .send(MessageType::ReaderRemove, MINIMAL_READER_ID, &[])
        .await
    {
        error!("failed to send startup ReaderRemove: {e}");
        return ExitCode::WriteError;
    }

    if let Err(e) = backend.init(&options).await {
        error!("backend init failed: {e}");
        return ExitCode::UsageError;
    }

    let pump = tokio::spawn(event_pump::run(
        Arc::clone(&backend),
        Arc::clone(&registry),
        Arc::clone(&gate),
        Arc::clone(&send_gate),
    ));

    if console {
        tokio::spawn(console::run(
            tokio::io::stdin(),
            Arc::clone(&backend),
            Arc::clone(&registry),
            Arc::clone(&send_gate),
        ));
    }

    info!("session established with {host}:{port}");
    let result = session_loop::run(backend, registry, gate, send_gate, read_half, host, port).await;
    pump.abort();
    exit_code_for_result(result)
}

/// Maps a terminated session loop's result to the process exit code
/// documented in spec.md §6. Split out from [`run`] so the mapping
/// itself — in particular that a write failure (16) is never confused
/// with a short/EOF read (8) — is unit-testable without any socket I/O.
fn exit_code_for_result(result: Result<(), SessionError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::Ok,
        Err(SessionError::ReadIo(e)) => {
            error!("session loop terminated on a short/EOF read: {e}");
            ExitCode::ShortRead
        }
        Err(SessionError::WriteIo(e)) => {
            error!("session loop terminated on a send-gate write error: {e}");
            ExitCode::WriteError
        }
        Err(SessionError::ConnectIo(e)) => {
            error!("reconnect failed: {e}");
            ExitCode::ConnectFailure
        }
        Err(SessionError::Protocol(e)) => {
            error!("session loop terminated on protocol error: {e}");
            ExitCode::ShortRead
        }
        Err(SessionError::Fatal(msg)) => {
            error!("session loop terminated: {msg}");
            ExitCode::ShortRead
        }
    }
}
