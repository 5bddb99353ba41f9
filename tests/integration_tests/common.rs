// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared loopback-socket harness for the end-to-end tests: a real
//! `TcpListener` stands in for the hypervisor, and
//! `vscclient_rs::backend::mock::MockBackend` stands in for the local
//! card backend, so the session loop and event pump run exactly as they
//! would in production, just talking to a scripted peer.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};
use vscclient_rs::wire::{HEADER_LEN, Header, MessageType, UNDEFINED_READER_ID};

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn start_listener() -> Result<(TcpListener, u16)> {
    let listener = TcpListener::bind("127.0.0.1:0").await.context("bind loopback listener")?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

pub async fn read_frame(stream: &mut TcpStream) -> Result<(Header, Vec<u8>)> {
    timeout(FRAME_TIMEOUT, async {
        let mut header_bytes = [0u8; HEADER_LEN];
        stream.read_exact(&mut header_bytes).await?;
        let header = Header::decode(&header_bytes).map_err(std::io::Error::other)?;
        let mut payload = vec![0u8; header.length as usize];
        if header.length > 0 {
            stream.read_exact(&mut payload).await?;
        }
        Ok::<_, std::io::Error>((header, payload))
    })
    .await
    .context("timed out waiting for a frame")?
    .context("reading frame")
}

pub async fn send_frame(
    stream: &mut TcpStream,
    msg_type: MessageType,
    reader_id: u32,
    payload: &[u8],
) -> Result<()> {
    let header = Header::new(msg_type, reader_id, payload.len() as u32);
    stream.write_all(&header.encode()).await?;
    if !payload.is_empty() {
        stream.write_all(payload).await?;
    }
    Ok(())
}

/// Accepts the client's connection and consumes the startup
/// `ReaderRemove(MINIMAL_READER_ID)` cleanup message.
pub async fn accept_and_handshake(listener: &TcpListener) -> Result<TcpStream> {
    let (mut stream, _) = timeout(FRAME_TIMEOUT, listener.accept())
        .await
        .context("timed out waiting for client connection")??;
    let (header, _payload) = read_frame(&mut stream).await?;
    if header.msg_type != MessageType::ReaderRemove || header.reader_id != vscclient_rs::wire::MINIMAL_READER_ID {
        bail!("expected startup ReaderRemove(MINIMAL_READER_ID), got {header:?}");
    }
    Ok(stream)
}

/// Reads the next frame and asserts it is a `ReaderAdd` with the
/// unassigned sentinel id, returning the decoded name.
pub async fn expect_reader_add(stream: &mut TcpStream) -> Result<String> {
    let (header, payload) = read_frame(stream).await?;
    if header.msg_type != MessageType::ReaderAdd {
        bail!("expected ReaderAdd, got {:?}", header.msg_type);
    }
    if header.reader_id != UNDEFINED_READER_ID {
        bail!("expected UNDEFINED_READER_ID, got {}", header.reader_id);
    }
    Ok(String::from_utf8(payload)?)
}
