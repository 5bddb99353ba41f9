// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The session loop: owns the socket's read half, dispatches inbound
//! messages, drives the APDU round trip through the backend, and handles
//! host-initiated reconnects.

use std::sync::Arc;

use tokio::{
    io::AsyncReadExt,
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};
use tracing::warn;

use crate::{
    backend::{Backend, XfrResult},
    error::SessionError,
    reader::ReaderRegistry,
    session::{pending::PendingAttachGate, send_gate::SendGate},
    wire::{Apdu, ErrorCode, ErrorPayload, HEADER_LEN, Header, MessageType, Reconnect},
};

async fn read_frame(reader: &mut OwnedReadHalf) -> std::io::Result<(Header, Vec<u8>)> {
    let mut header_bytes = [0u8; HEADER_LEN];
    reader.read_exact(&mut header_bytes).await?;
    let header = Header::decode(&header_bytes).map_err(std::io::Error::other)?;

    let mut payload = vec![0u8; header.length as usize];
    if header.length > 0 {
        reader.read_exact(&mut payload).await?;
    }
    Ok((header, payload))
}

/// Drives the session loop until a fatal transport or protocol error
/// occurs. `Reconnect` is handled in place: the read half is swapped and
/// the loop resumes without returning.
pub async fn run<B: Backend>(
    backend: Arc<B>,
    registry: Arc<ReaderRegistry>,
    gate: Arc<PendingAttachGate>,
    send_gate: Arc<SendGate<OwnedWriteHalf>>,
    mut read_half: OwnedReadHalf,
    mut host: String,
    mut port: u16,
) -> Result<(), SessionError> {
    loop {
        let (header, payload) = read_frame(&mut read_half).await.map_err(SessionError::ReadIo)?;

        match header.msg_type {
            MessageType::Apdu => {
                dispatch_apdu(&backend, &registry, &send_gate, header.reader_id, &payload).await?;
            }
            MessageType::Reconnect => {
                let reconnect = Reconnect::decode(&payload)?;
                let (new_host, new_port) = if reconnect.ip == 0 {
                    // ip == 0 means "same host, bump the port by one".
                    (host.clone(), port + 1)
                } else {
                    (reconnect.ip_addr().to_string(), reconnect.port)
                };

                let stream = TcpStream::connect((new_host.as_str(), new_port))
                    .await
                    .map_err(SessionError::ConnectIo)?;
                let _ = stream.set_nodelay(true);
                let (new_read, new_write) = stream.into_split();

                // The pending-attach slot is intentionally *not* reset
                // here: the host is expected to re-send
                // `ReaderAddResponse` after migration to unblock it.
                send_gate.replace(new_write).await;
                read_half = new_read;
                host = new_host;
                port = new_port;
            }
            MessageType::ReaderAddResponse => {
                if let Some(reader) = gate.resolve(header.reader_id).await {
                    registry.assign(&reader, header.reader_id);
                }
            }
            MessageType::Error => {
                let error_payload = ErrorPayload::decode(&payload)?;
                if error_payload.is(ErrorCode::CannotAddMoreReaders) {
                    gate.reject().await;
                } else {
                    warn!("host reported error code {}", error_payload.code);
                }
            }
            other => {
                return Err(SessionError::Fatal(format!(
                    "unexpected message type {other:?} on session loop"
                )));
            }
        }
    }
}

async fn dispatch_apdu<B: Backend>(
    backend: &Arc<B>,
    registry: &Arc<ReaderRegistry>,
    send_gate: &Arc<SendGate<OwnedWriteHalf>>,
    reader_id: u32,
    payload: &[u8],
) -> Result<(), SessionError> {
    let command = Apdu::decode(payload)?;

    let Some(reader) = registry.by_id(reader_id) else {
        // Not itself a protocol violation (the reader may have just been
        // removed); report it the same way a backend error would be.
        let error = ErrorPayload::new(ErrorCode::GeneralError);
        send_gate
            .send(MessageType::Error, reader_id, &error.encode())
            .await
            .map_err(SessionError::WriteIo)?;
        return Ok(());
    };

    match backend.reader_xfr(reader.handle, &command.bytes).await {
        Ok(XfrResult::Ok(response)) => {
            send_gate
                .send(MessageType::Apdu, reader_id, &response)
                .await
                .map_err(SessionError::WriteIo)?;
        }
        Ok(XfrResult::Error(status)) => {
            let error = ErrorPayload { code: status };
            send_gate
                .send(MessageType::Error, reader_id, &error.encode())
                .await
                .map_err(SessionError::WriteIo)?;
        }
        Err(_) => {
            let error = ErrorPayload::new(ErrorCode::GeneralError);
            send_gate
                .send(MessageType::Error, reader_id, &error.encode())
                .await
                .map_err(SessionError::WriteIo)?;
        }
    }
    Ok(())
}
