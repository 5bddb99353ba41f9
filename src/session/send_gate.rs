// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The send gate: exclusive write access to the socket so that a
//! message's header and payload are always contiguous on the wire,
//! regardless of which task — event pump or session loop — is writing.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::wire::{Header, MessageType};

/// Serializes all writers of one socket. Generic over the write half so
/// tests can drive it over an in-memory duplex stream instead of a real
/// `TcpStream`.
pub struct SendGate<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> SendGate<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Atomically writes `header(type, reader_id, payload.len()) + payload`.
    pub async fn send(
        &self,
        msg_type: MessageType,
        reader_id: u32,
        payload: &[u8],
    ) -> std::io::Result<()> {
        let header = Header::new(msg_type, reader_id, payload.len() as u32);
        let mut writer = self.writer.lock().await;
        writer.write_all(&header.encode()).await?;
        if !payload.is_empty() {
            writer.write_all(payload).await?;
        }
        writer.flush().await
    }

    /// Swaps in a new write half after a `Reconnect`. The pending-attach
    /// slot is untouched — only the socket changes.
    pub async fn replace(&self, writer: W) {
        *self.writer.lock().await = writer;
    }
}
