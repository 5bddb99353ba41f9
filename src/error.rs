// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Crate-wide error taxonomy, split by the layer that raises it so the
//! session loop can decide what's fatal and `main` can map a failure to
//! one of the documented process exit codes without re-deriving that
//! classification.

use thiserror::Error;

/// Errors raised by the wire codec (`wire::header`, `wire::message`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VscError {
    #[error("malformed header")]
    Malformed,
    #[error("unsupported message type {0}")]
    Unsupported(u32),
    #[error("truncated payload: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
}

/// Errors that can terminate the session loop (C5).
///
/// I/O failures are tagged by which side of the socket raised them:
/// spec.md §6/§7 documents distinct exit codes for a short/EOF read
/// (8), a connect failure (5), and a send-gate write failure (16), so a
/// single untagged `Io` variant would lose the information `main` needs
/// to pick the right one.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] VscError),
    #[error("read error: {0}")]
    ReadIo(std::io::Error),
    #[error("write error: {0}")]
    WriteIo(std::io::Error),
    #[error("connect error: {0}")]
    ConnectIo(std::io::Error),
    #[error("fatal: {0}")]
    Fatal(String),
}

/// Process exit codes. Only `main.rs` should construct or match on
/// these; internal code propagates `SessionError`/`anyhow::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    ThreadCreateFailure = 1,
    UsageError = 4,
    ConnectFailure = 5,
    ReadinessWaitError = 7,
    ShortRead = 8,
    WriteError = 16,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}
