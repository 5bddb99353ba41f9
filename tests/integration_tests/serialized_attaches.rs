// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Two `READER_INSERT` events in quick succession. The second reader's
//! `ReaderAdd` must not appear on the wire until the first's
//! `ReaderAddResponse` has arrived: at most one pending attach at a time.

use std::time::Duration;

use anyhow::Result;
use vscclient_rs::{
    backend::{BackendOptions, Event, mock::MockBackend},
    wire::MessageType,
};

use crate::integration_tests::common::{accept_and_handshake, expect_reader_add, send_frame, start_listener};

#[tokio::test]
async fn second_attach_waits_for_first_response() -> Result<()> {
    let (listener, port) = start_listener().await?;

    let backend = MockBackend::new();
    backend.register_reader(1, "R0");
    backend.register_reader(2, "R1");
    backend.push_event(Event::ReaderInsert {
        handle: 1,
        name: "R0".to_string(),
    });
    backend.push_event(Event::ReaderInsert {
        handle: 2,
        name: "R1".to_string(),
    });

    let client = tokio::spawn(vscclient_rs::session::run(
        backend,
        BackendOptions::default(),
        "127.0.0.1".to_string(),
        port,
        false,
    ));

    let mut server = accept_and_handshake(&listener).await?;

    let first = expect_reader_add(&mut server).await?;
    assert_eq!(first, "R0");

    // The second ReaderAdd must not show up while the first is pending.
    let race = tokio::time::timeout(Duration::from_millis(80), expect_reader_add(&mut server)).await;
    assert!(race.is_err(), "second ReaderAdd arrived before the first resolved");

    send_frame(&mut server, MessageType::ReaderAddResponse, 0, &[]).await?;

    let second = expect_reader_add(&mut server).await?;
    assert_eq!(second, "R1");

    client.abort();
    Ok(())
}
