// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Command-line surface: a `clap::Parser`-derived `Args` that
//! [`crate::cfg::config::ClientConfig::from_args`] turns into the
//! resolved configuration the session core consumes.

use clap::Parser;

/// Maximum number of repeatable `-c` certificate nicknames.
pub const MAX_CERTS: usize = 100;

/// `vscclient [-c cert]... [-e emul_args] [-d level] [-p] <host> <port>`
#[derive(Parser, Debug)]
#[command(name = "vscclient", author, version, about = "Virtual smart card client daemon")]
pub struct Args {
    /// Add a certificate nickname to the soft-CAC emulator configuration
    /// (repeatable, max 100).
    #[arg(short = 'c', long = "cert")]
    pub cert: Vec<String>,

    /// Pass-through configuration string for the backend (e.g. NSS DB path).
    #[arg(short = 'e', long = "emul-args")]
    pub emul_args: Option<String>,

    /// Select the passthrough backend, if compiled in.
    #[arg(short = 'p', long = "passthrough")]
    pub passthrough: bool,

    /// Verbosity level.
    #[arg(short = 'd', long = "debug", default_value_t = 0)]
    pub debug: u8,

    /// Disable the interactive line console.
    #[arg(long = "no-console")]
    pub no_console: bool,

    /// Hypervisor host to connect to.
    pub host: String,

    /// Hypervisor port to connect to.
    pub port: u16,
}

impl Args {
    /// Usage-error validation not expressible through `clap` derive
    /// alone: `-p` without the `passthru` feature is a usage error.
    pub fn validate(&self) -> Result<(), String> {
        if self.passthrough && !cfg!(feature = "passthru") {
            return Err("passthrough mode (-p) requires the `passthru` feature".to_string());
        }
        if self.cert.len() > MAX_CERTS {
            return Err(format!("too many certificates (max = {MAX_CERTS})"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_minimal_positional_args() {
        let args = Args::parse_from(["vscclient", "10.0.0.1", "5900"]);
        assert_eq!(args.host, "10.0.0.1");
        assert_eq!(args.port, 5900);
        assert!(args.cert.is_empty());
        assert_eq!(args.debug, 0);
    }

    #[test]
    fn parses_repeated_cert_flags() {
        let args = Args::parse_from([
            "vscclient", "-c", "cert1", "-c", "cert2", "10.0.0.1", "5900",
        ]);
        assert_eq!(args.cert, vec!["cert1".to_string(), "cert2".to_string()]);
    }

    #[test]
    fn rejects_more_than_max_certs() {
        let mut argv = vec!["vscclient".to_string()];
        for i in 0..(MAX_CERTS + 1) {
            argv.push("-c".to_string());
            argv.push(format!("cert{i}"));
        }
        argv.push("10.0.0.1".to_string());
        argv.push("5900".to_string());

        let args = Args::parse_from(argv);
        assert!(args.validate().is_err());
    }
}
