// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::VscError;

/// Wire-level message type, the zero-based ordinal of the declaration
/// order. The numeric values are load-bearing: they are what actually
/// crosses the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    Init = 0,
    Error = 1,
    ReaderAdd = 2,
    ReaderAddResponse = 3,
    ReaderRemove = 4,
    Atr = 5,
    CardRemove = 6,
    Apdu = 7,
    Reconnect = 8,
}

impl TryFrom<u32> for MessageType {
    type Error = VscError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => MessageType::Init,
            1 => MessageType::Error,
            2 => MessageType::ReaderAdd,
            3 => MessageType::ReaderAddResponse,
            4 => MessageType::ReaderRemove,
            5 => MessageType::Atr,
            6 => MessageType::CardRemove,
            7 => MessageType::Apdu,
            8 => MessageType::Reconnect,
            other => return Err(VscError::Unsupported(other)),
        })
    }
}

/// `type:u32, reader_id:u32, length:u32`, all big-endian.
pub const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub msg_type: MessageType,
    pub reader_id: u32,
    pub length: u32,
}

impl Header {
    pub fn new(msg_type: MessageType, reader_id: u32, length: u32) -> Self {
        Self {
            msg_type,
            reader_id,
            length,
        }
    }

    /// Encode the header into its 12-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        let mut cursor = Cursor::new(&mut buf[..]);
        // u32 writes into a fixed-size in-memory buffer never fail.
        cursor
            .write_u32::<BigEndian>(self.msg_type as u32)
            .expect("header buffer has room for the type field");
        cursor
            .write_u32::<BigEndian>(self.reader_id)
            .expect("header buffer has room for the reader_id field");
        cursor
            .write_u32::<BigEndian>(self.length)
            .expect("header buffer has room for the length field");
        buf
    }

    /// Decode a 12-byte buffer into a `Header`.
    ///
    /// Fails with [`VscError::Unsupported`] if `type` is not one of the
    /// known message types.
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<Self, VscError> {
        let mut cursor = Cursor::new(&buf[..]);
        let raw_type = cursor
            .read_u32::<BigEndian>()
            .map_err(|_| VscError::Malformed)?;
        let reader_id = cursor
            .read_u32::<BigEndian>()
            .map_err(|_| VscError::Malformed)?;
        let length = cursor
            .read_u32::<BigEndian>()
            .map_err(|_| VscError::Malformed)?;
        Ok(Self {
            msg_type: MessageType::try_from(raw_type)?,
            reader_id,
            length,
        })
    }
}
