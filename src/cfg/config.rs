// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Assembled runtime configuration: the `(host, port)` pair, the
//! pass-through/emulator choice, and the emulator-args/certificate merge
//! rule applied before handing the string to the card backend.

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{backend::BackendOptions, cfg::cli::Args};

/// Default NSS database path used as a fallback when `-c` is supplied
/// without `-e`.
const DEFAULT_NSS_DB_ARGS: &str = "db=\"/etc/pki/nssdb\"";

/// Daemon-local knobs that never cross the wire, kept as an explicit
/// value threaded through rather than process-wide `static` storage.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuntimeConfig {
    /// Verbosity level from `-d`, mapped to a `tracing::Level` by
    /// [`crate::cfg::logger::level_for_verbosity`].
    pub verbosity: u8,
    /// Run the interactive line console alongside the session loop.
    pub console: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            console: true,
        }
    }
}

/// The fully-resolved configuration `session::run` needs: the CLI
/// surface merged with the defaulting rule for `-c`/`-e`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub passthrough: bool,
    pub backend: BackendOptions,
    pub runtime: RuntimeConfig,
}

impl ClientConfig {
    /// Builds a [`ClientConfig`] from parsed CLI [`Args`], applying the
    /// `-c`-without-`-e` default and the `,soft=(...)` descriptor append
    /// rule.
    pub fn from_args(args: Args) -> Result<Self> {
        ensure!(
            args.cert.len() <= crate::cfg::cli::MAX_CERTS,
            "too many certificates (max = {})",
            crate::cfg::cli::MAX_CERTS
        );

        let emul_args = Self::assemble_emul_args(args.emul_args.as_deref(), &args.cert);

        Ok(Self {
            host: args.host,
            port: args.port,
            passthrough: args.passthrough,
            backend: BackendOptions { emul_args },
            runtime: RuntimeConfig {
                verbosity: args.debug,
                console: !args.no_console,
            },
        })
    }

    /// If certs were given without `-e`, defaults to the NSS db path,
    /// then appends
    /// `,soft=(,Virtual Reader,CAC,,<cert1>,<cert2>,…)`.
    fn assemble_emul_args(emul_args: Option<&str>, certs: &[String]) -> Option<String> {
        if certs.is_empty() {
            return emul_args.map(str::to_string);
        }

        let base = emul_args.unwrap_or(DEFAULT_NSS_DB_ARGS);
        let mut assembled = String::with_capacity(base.len() + 32 + certs.iter().map(|c| c.len() + 1).sum::<usize>());
        assembled.push_str(base);
        assembled.push_str(",soft=(,Virtual Reader,CAC,,");
        for cert in certs {
            assembled.push_str(cert);
            assembled.push(',');
        }
        assembled.push(')');
        Some(assembled)
    }
}
