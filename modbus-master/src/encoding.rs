use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

use crate::{crc::crc16, error::DecodeError};

pub trait Encodable {
    fn encode(&self, encoder: &mut Encoder);
}

pub struct Encoder {
    buffer: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(16),
        }
    }

    #[allow(unused)]
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16(value);
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.buffer.put_slice(value);
    }

    /// Appends the checksum of everything written so far, low byte first.
    pub fn write_crc(&mut self) {
        let crc = crc16(&self.buffer);
        self.buffer.put_u16_le(crc);
    }

    pub fn write_type<T>(&mut self, value: &T)
    where
        T: Encodable + ?Sized,
    {
        value.encode(self)
    }

    pub fn finish(self) -> Bytes {
        self.buffer.freeze()
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

pub struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Decoder<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buffer),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        if self.cursor.remaining() < 1 {
            return Err(DecodeError::MissingData);
        }
        Ok(self.cursor.get_u8())
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        if self.cursor.remaining() < 2 {
            return Err(DecodeError::MissingData);
        }
        Ok(self.cursor.get_u16())
    }

    /// Borrows the next `length` bytes without copying.
    pub fn read_bytes(&mut self, length: usize) -> DecodeResult<&'a [u8]> {
        if self.cursor.remaining() < length {
            return Err(DecodeError::MissingData);
        }
        let start = self.position();
        let buffer: &'a [u8] = *self.cursor.get_ref();
        self.cursor.advance(length);
        Ok(&buffer[start..start + length])
    }

    /// Unpacks `length` bits, least significant bit of each byte first.
    pub fn read_bools(&mut self, length: usize) -> DecodeResult<Vec<bool>> {
        let byte_length = length.div_ceil(8);
        let mut values = Vec::with_capacity(length);
        for _ in 0..byte_length {
            let byte = self.read_u8()?;
            for bit in 0..8 {
                if values.len() == length {
                    break;
                }
                values.push((byte & (1 << bit)) > 0);
            }
        }
        Ok(values)
    }

    /// Reads up to `length` big-endian registers, stopping before a partial one.
    pub fn read_registers(&mut self, length: usize) -> Vec<u16> {
        let count = length.min(self.cursor.remaining() / 2);
        (0..count).map(|_| self.cursor.get_u16()).collect()
    }
}
