// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Logging: a thin `tracing`/`tracing-subscriber` init writing advisory
//! diagnostics to stderr. This daemon runs one linear session rather
//! than a per-request pipeline, so there's no span-heavy structured JSON
//! stack here — see DESIGN.md for what was dropped and why.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Maps the `-d`/`--debug` verbosity level to a `tracing::Level`: more
/// logging at higher `-d`.
pub fn level_for_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global `tracing` subscriber, writing to stderr.
/// `RUST_LOG` overrides `verbosity` when set.
pub fn init_logger(verbosity: u8) -> Result<()> {
    let default_level = level_for_verbosity(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
        .context("init_logger")
}
