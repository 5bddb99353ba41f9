// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The interactive command console: external to the core client logic,
//! listed as an optional third task. Runs as its own task reading line
//! commands from stdin, talking to the backend facade directly and, for
//! `exit`, politely tearing down readers on the wire before calling
//! `exit(0)`.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::net::tcp::OwnedWriteHalf;

use crate::{
    backend::Backend,
    error::ExitCode,
    reader::ReaderRegistry,
    session::send_gate::SendGate,
    wire::{MessageType, UNDEFINED_READER_ID},
};

fn parse_id(rest: &str, default_id: u32) -> u32 {
    match rest.trim().parse::<u32>() {
        Ok(id) => id,
        // Don't accidentally switch to zero just because no digits
        // were supplied.
        Err(_) => default_id,
    }
}

/// Runs the console loop until stdin closes or `exit` is entered.
pub async fn run<B: Backend>(
    stdin: Stdin,
    backend: Arc<B>,
    registry: Arc<ReaderRegistry>,
    send_gate: Arc<SendGate<OwnedWriteHalf>>,
) {
    let default_reader_id = AtomicU32::new(0);
    let mut lines = BufReader::new(stdin).lines();

    print!("> ");
    let _ = tokio::io::AsyncWriteExt::flush(&mut tokio::io::stdout()).await;

    while let Ok(Some(line)) = lines.next_line().await {
        handle_line(&line, &backend, &registry, &send_gate, &default_reader_id).await;
        print!("> ");
        let _ = tokio::io::AsyncWriteExt::flush(&mut tokio::io::stdout()).await;
    }
}

async fn handle_line<B: Backend>(
    line: &str,
    backend: &Arc<B>,
    registry: &Arc<ReaderRegistry>,
    send_gate: &Arc<SendGate<OwnedWriteHalf>>,
    default_reader_id: &AtomicU32,
) {
    let default_id = default_reader_id.load(Ordering::SeqCst);

    if let Some(rest) = line.strip_prefix("insert") {
        let id = if let Some(arg) = rest.strip_prefix(' ') { parse_id(arg, default_id) } else { default_id };
        match registry.by_id(id) {
            Some(reader) => {
                let result = backend.force_card_insert(reader.handle).await;
                println!("insert {}, returned {:?}", reader.name, result.is_ok());
            }
            None => println!("insert invalid reader, returned false"),
        }
    } else if let Some(rest) = line.strip_prefix("remove") {
        let id = if let Some(arg) = rest.strip_prefix(' ') { parse_id(arg, default_id) } else { default_id };
        match registry.by_id(id) {
            Some(reader) => {
                let result = backend.force_card_remove(reader.handle).await;
                println!("remove {}, returned {:?}", reader.name, result.is_ok());
            }
            None => println!("remove invalid reader, returned false"),
        }
    } else if let Some(rest) = line.strip_prefix("select") {
        let id = if let Some(arg) = rest.strip_prefix(' ') { parse_id(arg, UNDEFINED_READER_ID) } else { UNDEFINED_READER_ID };
        match registry.by_id(id) {
            Some(reader) => {
                println!("Selecting reader {id}, {}", reader.name);
                default_reader_id.store(id, Ordering::SeqCst);
            }
            None => println!("Reader with id {id} not found"),
        }
    } else if line.starts_with("list") {
        println!("Active Readers:");
        for reader in registry.list() {
            if !reader.is_assigned() {
                continue;
            }
            let card = if reader.card_state().present { "CARD_PRESENT" } else { "            " };
            println!("{:3} {} {}", reader.id(), card, reader.name);
        }
        println!("Inactive Readers:");
        for reader in registry.list() {
            if reader.is_assigned() {
                continue;
            }
            let card = if reader.card_state().present { "CARD_PRESENT" } else { "            " };
            println!("INA {} {}", card, reader.name);
        }
    } else if let Some(rest) = line.strip_prefix("debug") {
        let level = rest.trim().parse::<u8>().unwrap_or(0);
        println!("debug level = {level}");
    } else if line.trim() == "exit" {
        for reader in registry.list() {
            if !reader.is_assigned() {
                continue;
            }
            let id = reader.id();
            if reader.card_state().present {
                let _ = send_gate.send(MessageType::CardRemove, id, &[]).await;
            }
            let _ = send_gate.send(MessageType::ReaderRemove, id, &[]).await;
        }
        std::process::exit(ExitCode::Ok.code());
    } else if !line.trim().is_empty() {
        println!("valid commands: ");
        println!("insert [reader_id]");
        println!("remove [reader_id]");
        println!("select reader_id");
        println!("list");
        println!("debug [level]");
        println!("exit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_falls_back_on_non_numeric_input() {
        assert_eq!(parse_id("abc", 7), 7);
        assert_eq!(parse_id("0", 7), 0);
        assert_eq!(parse_id(" 12 ", 7), 12);
    }
}
