use std::{fmt::Display, str::FromStr};

use bytes::Bytes;

use crate::{
    consts::*,
    crc::{crc16, verify_crc},
    encoding::{DecodeResult, Decoder, Encoder},
    error::DecodeError,
};

/// Wire variant. Each variant knows where the function code sits and how the
/// request body is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// MBAP header, no checksum.
    #[default]
    Tcp,
    /// Slave id prefix and CRC trailer.
    Rtu,
}

/// A response split into its framing fields and the PDU.
#[derive(Debug, PartialEq)]
pub struct Adu<'a> {
    pub transaction_id: Option<u16>,
    pub unit_id: u8,
    /// Function code and its payload.
    pub pdu: &'a [u8],
}

impl Protocol {
    /// Where the PDU region begins inside a frame.
    pub fn pdu_offset(self) -> usize {
        match self {
            Protocol::Tcp => MBAP_HEADER_LEN,
            Protocol::Rtu => 0,
        }
    }

    /// Position of the function code byte. The TCP unit id lives in the
    /// header; the RTU slave id is the first byte of the PDU region.
    pub fn function_code_offset(self) -> usize {
        match self {
            Protocol::Tcp => self.pdu_offset(),
            Protocol::Rtu => self.pdu_offset() + 1,
        }
    }

    /// Wraps a request body (`unit id, function code, payload`) for the wire.
    pub(crate) fn encapsulate(self, body: &[u8], transaction_id: u16) -> Bytes {
        let mut encoder = Encoder::new();
        match self {
            Protocol::Tcp => {
                encoder.write_u16(transaction_id);
                encoder.write_u16(TCP_PROTOCOL_ID);
                encoder.write_u16(body.len() as u16);
                encoder.write_bytes(body);
            }
            Protocol::Rtu => {
                encoder.write_bytes(body);
                encoder.write_crc();
            }
        }
        encoder.finish()
    }

    /// Validates the framing of a complete response and returns its PDU.
    pub fn open(self, buffer: &[u8]) -> DecodeResult<Adu<'_>> {
        match self {
            Protocol::Tcp => open_tcp(buffer, self.function_code_offset()),
            Protocol::Rtu => open_rtu(buffer, self.function_code_offset()),
        }
    }
}

fn open_tcp(buffer: &[u8], function_code_offset: usize) -> DecodeResult<Adu<'_>> {
    let mut decoder = Decoder::new(buffer);
    let transaction_id = decoder.read_u16()?;
    let protocol_id = decoder.read_u16()?;
    let length = decoder.read_u16()? as usize;
    let unit_id = decoder.read_u8()?;

    if protocol_id != TCP_PROTOCOL_ID {
        return Err(DecodeError::InvalidData("Protocol id is not 0"));
    }
    if length < 2 {
        return Err(DecodeError::InvalidData("MBAP length too small"));
    }

    let end = MBAP_HEADER_LEN - 1 + length;
    if buffer.len() < end {
        return Err(DecodeError::MissingData);
    }
    if buffer.len() > end {
        return Err(DecodeError::InvalidData("Trailing bytes after frame"));
    }

    Ok(Adu {
        transaction_id: Some(transaction_id),
        unit_id,
        pdu: &buffer[function_code_offset..end],
    })
}

fn open_rtu(buffer: &[u8], function_code_offset: usize) -> DecodeResult<Adu<'_>> {
    if buffer.len() < RTU_MIN_FRAME_LEN {
        return Err(DecodeError::MissingData);
    }

    let end = buffer.len() - 2;
    if !verify_crc(buffer) {
        return Err(DecodeError::CrcMismatch {
            expected: crc16(&buffer[..end]),
            actual: u16::from_le_bytes([buffer[end], buffer[end + 1]]),
        });
    }

    Ok(Adu {
        transaction_id: None,
        unit_id: buffer[0],
        pdu: &buffer[function_code_offset..end],
    })
}

impl Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Rtu => write!(f, "RTU"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "RTU" => Ok(Protocol::Rtu),
            _ => Err(format!("Unknown protocol '{s}', expected TCP or RTU")),
        }
    }
}
