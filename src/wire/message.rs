// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Payload shapes for each [`crate::wire::MessageType`]. Every type here
//! is "packed, no padding": `encode` produces exactly the bytes that go
//! on the wire after the header, and `decode` is the inverse.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::VscError;

/// `Init` payload: the packed protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Init {
    pub version: u32,
}

impl Init {
    pub fn encode(&self) -> Vec<u8> {
        self.version.to_be_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, VscError> {
        let mut cursor = Cursor::new(buf);
        let version = cursor
            .read_u32::<BigEndian>()
            .map_err(|_| VscError::Truncated {
                expected: 4,
                got: buf.len(),
            })?;
        Ok(Self { version })
    }
}

/// `Error` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    GeneralError = 1,
    CannotAddMoreReaders = 2,
}

impl TryFrom<u32> for ErrorCode {
    type Error = VscError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => ErrorCode::GeneralError,
            2 => ErrorCode::CannotAddMoreReaders,
            // Unknown error codes are logged-only by the session loop,
            // not a protocol violation, so callers that need the raw
            // value fall back to GeneralError here and the session loop
            // reads the raw u32 itself before this cast.
            _ => ErrorCode::GeneralError,
        })
    }
}

/// `Error` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: u32,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode) -> Self {
        Self { code: code as u32 }
    }

    pub fn encode(&self) -> Vec<u8> {
        self.code.to_be_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, VscError> {
        let mut cursor = Cursor::new(buf);
        let code = cursor
            .read_u32::<BigEndian>()
            .map_err(|_| VscError::Truncated {
                expected: 4,
                got: buf.len(),
            })?;
        Ok(Self { code })
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code as u32
    }
}

/// `ReaderAdd` payload: an optional UTF-8 reader name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderAdd {
    pub name: String,
}

impl ReaderAdd {
    pub fn encode(&self) -> Vec<u8> {
        self.name.clone().into_bytes()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, VscError> {
        let name = String::from_utf8(buf.to_vec()).map_err(|_| VscError::Malformed)?;
        Ok(Self { name })
    }
}

/// `ATR` payload: raw answer-to-reset bytes (≤ 40 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atr {
    pub bytes: Vec<u8>,
}

impl Atr {
    pub fn encode(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, VscError> {
        Ok(Self {
            bytes: buf.to_vec(),
        })
    }
}

/// `APDU` payload: a raw ISO 7816 command or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    pub bytes: Vec<u8>,
}

impl Apdu {
    pub fn encode(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, VscError> {
        Ok(Self {
            bytes: buf.to_vec(),
        })
    }
}

/// `Reconnect` payload: `ip == 0` means "same host, port+1".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconnect {
    pub ip: u32,
    pub port: u16,
}

impl Reconnect {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(6);
        buf.write_u32::<BigEndian>(self.ip).expect("vec writes never fail");
        buf.write_u16::<BigEndian>(self.port).expect("vec writes never fail");
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, VscError> {
        let mut cursor = Cursor::new(buf);
        let ip = cursor
            .read_u32::<BigEndian>()
            .map_err(|_| VscError::Truncated {
                expected: 6,
                got: buf.len(),
            })?;
        let port = cursor
            .read_u16::<BigEndian>()
            .map_err(|_| VscError::Truncated {
                expected: 6,
                got: buf.len(),
            })?;
        Ok(Self { ip, port })
    }

    /// `std::net::Ipv4Addr` dotted form, for logging/reconnect.
    pub fn ip_addr(&self) -> std::net::Ipv4Addr {
        std::net::Ipv4Addr::from(self.ip)
    }
}
