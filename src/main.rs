// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::process::ExitCode as ProcessExitCode;

use clap::Parser;
use vscclient_rs::{
    backend::soft,
    cfg::{cli::Args, config::ClientConfig, logger::init_logger},
    error::ExitCode,
    session,
};

#[tokio::main]
async fn main() -> ProcessExitCode {
    let args = Args::parse();

    if let Err(msg) = args.validate() {
        eprintln!("{msg}");
        eprintln!("vscclient [-c cert]... [-e emul_args] [-d level] [-p] <host> <port>");
        return exit(ExitCode::UsageError);
    }

    let config = match ClientConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return exit(ExitCode::UsageError);
        }
    };

    if let Err(e) = init_logger(config.runtime.verbosity) {
        eprintln!("failed to initialize logger: {e:#}");
    }

    if config.passthrough {
        // The real PC/SC passthrough backend is out of scope here; `-p`
        // is accepted by the CLI surface but has no backend wired up in
        // this build.
        eprintln!("passthrough backend is not available in this build");
        return exit(ExitCode::UsageError);
    }

    let backend = soft::new_shared();
    let code = session::run(
        backend,
        config.backend,
        config.host,
        config.port,
        config.runtime.console,
    )
    .await;
    exit(code)
}

fn exit(code: ExitCode) -> ProcessExitCode {
    ProcessExitCode::from(code.code() as u8)
}
