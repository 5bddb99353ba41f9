// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The host rejects an attach with `Error{CANNOT_ADD_MORE_READERS}`; the
//! reader never gets an id and a subsequent `CARD_INSERT` for it is
//! silently dropped as a protocol-recoverable condition, not a fatal one.

use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncReadExt;
use vscclient_rs::{
    backend::{BackendOptions, Event, mock::MockBackend},
    wire::{ErrorCode, ErrorPayload, MessageType},
};

use crate::integration_tests::common::{accept_and_handshake, expect_reader_add, send_frame, start_listener};

#[tokio::test]
async fn rejected_attach_drops_subsequent_card_insert() -> Result<()> {
    let (listener, port) = start_listener().await?;

    let backend = MockBackend::new();
    backend.register_reader(1, "R0");
    backend.push_event(Event::ReaderInsert {
        handle: 1,
        name: "R0".to_string(),
    });

    let client = tokio::spawn(vscclient_rs::session::run(
        backend.clone(),
        BackendOptions::default(),
        "127.0.0.1".to_string(),
        port,
        false,
    ));

    let mut server = accept_and_handshake(&listener).await?;
    let _ = expect_reader_add(&mut server).await?;

    let error = ErrorPayload::new(ErrorCode::CannotAddMoreReaders);
    send_frame(&mut server, MessageType::Error, 0, &error.encode()).await?;

    // Give the gate time to clear and the rejection to land, then try to
    // push a CARD_INSERT for the never-attached reader.
    tokio::time::sleep(Duration::from_millis(50)).await;
    backend.push_event(Event::CardInsert { handle: 1 });
    backend.close().await;

    // No ATR (or anything else) should ever arrive for this reader.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_millis(200), server.read(&mut buf))
        .await
        .expect("read should not hang")?;
    assert_eq!(n, 0, "no bytes should follow a dropped CARD_INSERT on a rejected reader");

    client.abort();
    Ok(())
}
