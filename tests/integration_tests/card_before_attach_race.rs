// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `READER_INSERT(R1)` immediately followed by `CARD_INSERT(R1)` while
//! R1's attach is outstanding. The `CARD_INSERT` must not produce an
//! `ATR` until R1 has been assigned an id.

use std::time::Duration;

use anyhow::Result;
use vscclient_rs::{
    backend::{BackendOptions, Event, mock::MockBackend},
    wire::MessageType,
};

use crate::integration_tests::common::{accept_and_handshake, expect_reader_add, read_frame, send_frame, start_listener};

#[tokio::test]
async fn card_insert_waits_for_attach_then_sends_atr() -> Result<()> {
    let (listener, port) = start_listener().await?;

    let backend = MockBackend::new();
    backend.register_reader(1, "R1");
    backend.push_event(Event::ReaderInsert {
        handle: 1,
        name: "R1".to_string(),
    });
    backend.push_event(Event::CardInsert { handle: 1 });

    let client = tokio::spawn(vscclient_rs::session::run(
        backend,
        BackendOptions::default(),
        "127.0.0.1".to_string(),
        port,
        false,
    ));

    let mut server = accept_and_handshake(&listener).await?;
    let _ = expect_reader_add(&mut server).await?;

    // Hold the response for a beat; the CARD_INSERT must not race ahead.
    tokio::time::sleep(Duration::from_millis(50)).await;
    send_frame(&mut server, MessageType::ReaderAddResponse, 7, &[]).await?;

    let (header, _payload) = read_frame(&mut server).await?;
    assert_eq!(header.msg_type, MessageType::Atr);
    assert_eq!(header.reader_id, 7);

    client.abort();
    Ok(())
}
