use std::{fmt::Display, ops::Deref};

use bytes::Bytes;

use crate::{
    context::{ContextTracker, RequestContext},
    encoding::Encoder,
    error::RequestError,
    hex::to_hex,
    protocol::Protocol,
    request::RequestDescriptor,
};

/// A request ready for transmission. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    protocol: Protocol,
    transaction_id: Option<u16>,
    bytes: Bytes,
}

impl Frame {
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn transaction_id(&self) -> Option<u16> {
        self.transaction_id
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Upper-case hex, space separated.
impl Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", to_hex(&self.bytes))
    }
}

/// Builds frames and hands out TCP transaction ids.
#[derive(Debug)]
pub struct FrameBuilder {
    next_transaction_id: u16,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self { next_transaction_id: 1 }
    }
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_transaction_id(&self) -> u16 {
        self.next_transaction_id
    }

    pub fn set_next_transaction_id(&mut self, transaction_id: u16) {
        self.next_transaction_id = transaction_id;
    }

    /// Builds the frame for `descriptor` and records its context in `tracker`.
    ///
    /// For TCP the supplied `transaction_id` is used, otherwise the next value
    /// of the rolling counter. RTU frames ignore it. An invalid descriptor
    /// leaves both the counter and the tracker untouched.
    pub fn build_frame(
        &mut self,
        descriptor: &RequestDescriptor,
        transaction_id: Option<u16>,
        tracker: &mut ContextTracker,
    ) -> Result<Frame, RequestError> {
        descriptor.validate()?;

        let transaction_id = match descriptor.protocol {
            Protocol::Tcp => Some(transaction_id.unwrap_or_else(|| self.allocate_transaction_id())),
            Protocol::Rtu => None,
        };

        let frame = build_frame(descriptor, transaction_id.unwrap_or_default());
        tracker.record(RequestContext::new(descriptor, transaction_id));

        Ok(Frame {
            protocol: descriptor.protocol,
            transaction_id,
            bytes: frame,
        })
    }

    fn allocate_transaction_id(&mut self) -> u16 {
        let transaction_id = self.next_transaction_id;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1);
        transaction_id
    }
}

/// Frames an already validated descriptor without touching any state.
fn build_frame(descriptor: &RequestDescriptor, transaction_id: u16) -> Bytes {
    let mut encoder = Encoder::new();
    encoder.write_type(descriptor);
    let body = encoder.finish();
    descriptor.protocol.encapsulate(&body, transaction_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crc::crc16, function_code::FunctionCode, request::Payload};

    fn descriptor(protocol: Protocol, function_code: FunctionCode) -> RequestDescriptor {
        let payload = if function_code.is_write() {
            Payload::Value(0xFF00)
        } else {
            Payload::Quantity(10)
        };
        RequestDescriptor {
            protocol,
            slave_id: 1,
            function_code,
            start_address: 0,
            payload,
        }
    }

    #[test]
    fn rtu_golden_frame() {
        let mut builder = FrameBuilder::new();
        let mut tracker = ContextTracker::new();
        let req = descriptor(Protocol::Rtu, FunctionCode::ReadHoldingRegisters);
        let frame = builder.build_frame(&req, None, &mut tracker).unwrap();
        assert_eq!(&frame[..], &[0x01u8, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD]);
        assert_eq!(frame.transaction_id(), None);
        assert_eq!(frame.to_string(), "01 03 00 00 00 0A C5 CD");
        assert_eq!(builder.next_transaction_id(), 1);
    }

    #[test]
    fn rtu_crc_trailer_for_every_function() {
        let mut builder = FrameBuilder::new();
        let mut tracker = ContextTracker::new();
        for function_code in FunctionCode::SUPPORTED {
            let frame = builder.build_frame(&descriptor(Protocol::Rtu, function_code), None, &mut tracker).unwrap();
            assert_eq!(frame.len(), 8);
            let crc = crc16(&frame[..6]);
            assert_eq!(frame[6], (crc & 0xFF) as u8);
            assert_eq!(frame[7], (crc >> 8) as u8);
        }
    }

    #[test]
    fn tcp_length_matches_trailing_bytes() {
        let mut builder = FrameBuilder::new();
        let mut tracker = ContextTracker::new();
        for function_code in FunctionCode::SUPPORTED {
            let frame = builder.build_frame(&descriptor(Protocol::Tcp, function_code), None, &mut tracker).unwrap();
            let length = u16::from_be_bytes([frame[4], frame[5]]) as usize;
            assert_eq!(length, frame.len() - 6);
            assert_eq!(&frame[2..4], &[0u8, 0]);
            assert_eq!(frame[6], 1);
            assert_eq!(frame[7], u8::from(function_code));
        }
    }

    #[test]
    fn tcp_transaction_ids() {
        let mut builder = FrameBuilder::new();
        let mut tracker = ContextTracker::new();
        let req = descriptor(Protocol::Tcp, FunctionCode::ReadCoils);

        let first = builder.build_frame(&req, None, &mut tracker).unwrap();
        let second = builder.build_frame(&req, None, &mut tracker).unwrap();
        assert_eq!(first.transaction_id(), Some(1));
        assert_eq!(second.transaction_id(), Some(2));
        assert_eq!(&second[..2], &[0u8, 2]);

        let explicit = builder.build_frame(&req, Some(0x1234), &mut tracker).unwrap();
        assert_eq!(&explicit[..2], &[0x12u8, 0x34]);
        assert_eq!(tracker.current().unwrap().transaction_id, Some(0x1234));
        assert_eq!(builder.next_transaction_id(), 3);

        builder.set_next_transaction_id(0xFFFF);
        assert_eq!(builder.build_frame(&req, None, &mut tracker).unwrap().transaction_id(), Some(0xFFFF));
        assert_eq!(builder.build_frame(&req, None, &mut tracker).unwrap().transaction_id(), Some(0));
    }

    #[test]
    fn tcp_frame_layout() {
        let mut builder = FrameBuilder::new();
        let mut tracker = ContextTracker::new();
        let req = RequestDescriptor::write_single_register(Protocol::Tcp, 0x11, 0x0001, 0x0003);
        let frame = builder.build_frame(&req, None, &mut tracker).unwrap();
        assert_eq!(frame.to_string(), "00 01 00 00 00 06 11 06 00 01 00 03");
    }

    #[test]
    fn context_recorded_only_on_success() {
        let mut builder = FrameBuilder::new();
        let mut tracker = ContextTracker::new();

        let invalid = RequestDescriptor::read(Protocol::Tcp, 1, FunctionCode::ReadHoldingRegisters, 0, 0);
        assert!(builder.build_frame(&invalid, None, &mut tracker).is_err());
        assert!(tracker.current().is_none());
        assert_eq!(builder.next_transaction_id(), 1);

        let req = RequestDescriptor::read(Protocol::Tcp, 1, FunctionCode::ReadDiscreteInputs, 100, 16);
        builder.build_frame(&req, None, &mut tracker).unwrap();
        let context = tracker.current().unwrap();
        assert_eq!(context.function_code, FunctionCode::ReadDiscreteInputs);
        assert_eq!(context.start_address, 100);
        assert_eq!(context.quantity, 16);
    }
}
