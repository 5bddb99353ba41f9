// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! While idle, the host sends `Reconnect(ip=0, port=P+1)`. The client
//! closes its socket and opens a new TCP connection to the same host on
//! `P+1`, then resumes accepting messages on the new connection.
//!
//! Binds a specific follow-up port rather than an ephemeral one, so this
//! test is marked `#[serial]`.

use anyhow::Result;
use serial_test::serial;
use tokio::net::TcpListener;
use vscclient_rs::{
    backend::{BackendOptions, mock::MockBackend},
    wire::{Reconnect, MessageType},
};

use crate::integration_tests::common::{accept_and_handshake, read_frame, send_frame, start_listener};

#[tokio::test]
#[serial]
async fn reconnect_with_ip_zero_bumps_port_by_one() -> Result<()> {
    let (listener, port) = start_listener().await?;
    let next_port = port + 1;
    let next_listener = TcpListener::bind(("127.0.0.1", next_port)).await?;

    let backend = MockBackend::new();
    let client = tokio::spawn(vscclient_rs::session::run(
        backend,
        BackendOptions::default(),
        "127.0.0.1".to_string(),
        port,
        false,
    ));

    let mut server = accept_and_handshake(&listener).await?;
    let reconnect = Reconnect { ip: 0, port: 0 };
    send_frame(&mut server, MessageType::Reconnect, 0, &reconnect.encode()).await?;

    // The client should now connect to port+1, on the same host.
    let (mut new_server, _) = next_listener.accept().await?;

    // Confirm the session loop resumed reading on the new connection: an
    // APDU for an unknown reader still gets an Error reply, not silence.
    send_frame(&mut new_server, MessageType::Apdu, 99, &[0x00, 0xA4]).await?;
    let (header, _payload) = read_frame(&mut new_server).await?;
    assert_eq!(header.msg_type, MessageType::Error);
    assert_eq!(header.reader_id, 99);

    client.abort();
    Ok(())
}
