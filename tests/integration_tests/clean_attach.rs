// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A clean attach assigns a server id, and a subsequent `APDU` round
//! trip against that id works end to end through the real session loop,
//! event pump, and a loopback socket.

use anyhow::Result;
use vscclient_rs::{
    backend::{BackendOptions, Event, XfrResult, mock::MockBackend},
    session,
    wire::MessageType,
};

use crate::integration_tests::common::{accept_and_handshake, expect_reader_add, read_frame, send_frame, start_listener};

#[tokio::test]
async fn clean_attach_then_apdu_round_trip() -> Result<()> {
    let (listener, port) = start_listener().await?;

    let backend = MockBackend::new();
    backend.register_reader(1, "R0");
    backend.set_xfr_response(1, XfrResult::Ok(vec![0x90, 0x00]));
    backend.push_event(Event::ReaderInsert {
        handle: 1,
        name: "R0".to_string(),
    });

    let client = tokio::spawn(session::run(backend, BackendOptions::default(), "127.0.0.1".to_string(), port, false));

    let mut server = accept_and_handshake(&listener).await?;

    // Clean attach.
    let name = expect_reader_add(&mut server).await?;
    assert_eq!(name, "R0");
    send_frame(&mut server, MessageType::ReaderAddResponse, 0, &[]).await?;

    // APDU round trip against the freshly-assigned id.
    send_frame(&mut server, MessageType::Apdu, 0, &[0x00, 0xA4, 0x04, 0x00]).await?;
    let (header, payload) = read_frame(&mut server).await?;
    assert_eq!(header.msg_type, MessageType::Apdu);
    assert_eq!(header.reader_id, 0);
    assert_eq!(payload, vec![0x90, 0x00]);

    client.abort();
    Ok(())
}

#[tokio::test]
async fn apdu_on_unknown_reader_id_reports_error_not_fatal() -> Result<()> {
    let (listener, port) = start_listener().await?;
    let backend = MockBackend::new();

    let client = tokio::spawn(session::run(backend, BackendOptions::default(), "127.0.0.1".to_string(), port, false));
    let mut server = accept_and_handshake(&listener).await?;

    send_frame(&mut server, MessageType::Apdu, 42, &[0x00, 0xA4]).await?;
    let (header, _payload) = read_frame(&mut server).await?;
    assert_eq!(header.msg_type, MessageType::Error);
    assert_eq!(header.reader_id, 42);

    client.abort();
    Ok(())
}
