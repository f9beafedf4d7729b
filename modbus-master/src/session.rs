use std::{future::Future, time::Duration};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::{
    config::{MasterConfig, DEFAULT_TIMEOUT},
    context::{ContextTracker, RequestContext},
    decoder::decode,
    error::{DecodeError, ModbusError, TransportError},
    frame::{Frame, FrameBuilder},
    hex::to_hex,
    protocol::Protocol,
    request::RequestDescriptor,
    value::Response,
};

/**
 * Moves frames to a device and back. Implemented by callers; the engine
 * ships no serial or socket link.
 *
 * One call must resolve to exactly one of: a complete response buffer, or a
 * [`TransportError`]. Partial reads are the transport's business.
 */
pub trait Transport {
    fn transact(&mut self, frame: &Frame) -> impl Future<Output = Result<Bytes, TransportError>> + Send;
}

/// A master talking to one link, one request at a time.
///
/// Holds the transaction counter, the context of the last request and the
/// pending flag. [`send`](Self::send) refuses to build a new frame until the
/// outstanding one is resolved by [`receive`](Self::receive) or
/// [`transport_failed`](Self::transport_failed).
#[derive(Debug)]
pub struct MasterSession {
    builder: FrameBuilder,
    tracker: ContextTracker,
    last_protocol: Option<Protocol>,
    pending: bool,
    timeout: Duration,
}

impl Default for MasterSession {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl MasterSession {
    pub fn new(timeout: Duration) -> Self {
        Self {
            builder: FrameBuilder::new(),
            tracker: ContextTracker::new(),
            last_protocol: None,
            pending: false,
            timeout,
        }
    }

    pub fn from_config(config: &MasterConfig) -> Self {
        Self::new(config.timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn context(&self) -> Option<&RequestContext> {
        self.tracker.current()
    }

    pub fn next_transaction_id(&self) -> u16 {
        self.builder.next_transaction_id()
    }

    pub fn set_next_transaction_id(&mut self, transaction_id: u16) {
        self.builder.set_next_transaction_id(transaction_id);
    }

    /// Builds the frame for `descriptor` and marks the session pending.
    pub fn send(&mut self, descriptor: &RequestDescriptor) -> Result<Frame, ModbusError> {
        self.send_with_transaction_id(descriptor, None)
    }

    pub fn send_with_transaction_id(&mut self, descriptor: &RequestDescriptor, transaction_id: Option<u16>) -> Result<Frame, ModbusError> {
        if self.pending {
            return Err(ModbusError::RequestPending);
        }

        let frame = self.builder.build_frame(descriptor, transaction_id, &mut self.tracker)?;
        self.last_protocol = Some(descriptor.protocol);
        self.pending = true;

        debug!("[TX] {frame}");
        Ok(frame)
    }

    /// Decodes a complete response for the last request. The session is no
    /// longer pending afterwards, whatever the outcome.
    pub fn receive(&mut self, buffer: &[u8]) -> Result<Response, ModbusError> {
        debug!("[RX] {}", to_hex(buffer));
        if !self.pending {
            warn!("Response received with no request pending");
        }
        self.pending = false;

        let protocol = self.last_protocol.ok_or(DecodeError::MissingContext)?;
        Ok(decode(buffer, self.tracker.current(), protocol)?)
    }

    /// Records a timeout or disconnect reported by the transport. Nothing is
    /// decoded; the session is ready for the next request.
    pub fn transport_failed(&mut self, error: TransportError) -> ModbusError {
        warn!("Transport failure: {error}");
        self.pending = false;
        ModbusError::Transport(error)
    }

    /// Forgets the last request entirely.
    pub fn reset(&mut self) {
        self.tracker.clear();
        self.last_protocol = None;
        self.pending = false;
    }

    /// Sends `descriptor` through `transport` and decodes the answer. The
    /// transport call is bounded by the session timeout.
    pub async fn execute<T: Transport>(&mut self, transport: &mut T, descriptor: &RequestDescriptor) -> Result<Response, ModbusError> {
        let frame = self.send(descriptor)?;

        let result = match tokio::time::timeout(self.timeout, transport.transact(&frame)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };

        match result {
            Ok(buffer) => self.receive(&buffer),
            Err(error) => Err(self.transport_failed(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function_code::FunctionCode;

    fn read_holding(protocol: Protocol, address: u16) -> RequestDescriptor {
        RequestDescriptor::read(protocol, 1, FunctionCode::ReadHoldingRegisters, address, 2)
    }

    #[test]
    fn second_send_rejected_while_pending() {
        let mut session = MasterSession::default();
        session.send(&read_holding(Protocol::Tcp, 0)).unwrap();
        assert!(session.is_pending());

        let result = session.send(&read_holding(Protocol::Tcp, 100));
        assert!(matches!(result, Err(ModbusError::RequestPending)));
        // The first request's context survives.
        assert_eq!(session.context().map(|c| c.start_address), Some(0));
    }

    #[test]
    fn receive_clears_pending() {
        let mut session = MasterSession::default();
        session.send(&read_holding(Protocol::Tcp, 0)).unwrap();

        let response = session
            .receive(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, 0x00, 0x0A, 0x01, 0x2C])
            .unwrap();
        assert_eq!(response.values().map(|v| v.len()), Some(2));
        assert!(!session.is_pending());

        // Context is read, not consumed.
        assert!(session.context().is_some());
        assert!(session.send(&read_holding(Protocol::Tcp, 5)).is_ok());
    }

    #[test]
    fn decode_error_also_clears_pending() {
        let mut session = MasterSession::default();
        session.send(&read_holding(Protocol::Rtu, 0)).unwrap();
        let result = session.receive(&[0x01, 0x03, 0x02, 0x00, 0x0A, 0x00, 0x00]);
        assert!(matches!(result, Err(ModbusError::Decode(DecodeError::CrcMismatch { .. }))));
        assert!(!session.is_pending());
    }

    #[test]
    fn receive_without_send() {
        let mut session = MasterSession::default();
        let result = session.receive(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x02]);
        assert!(matches!(result, Err(ModbusError::Decode(DecodeError::MissingContext))));
    }

    #[test]
    fn transport_failure_skips_decode() {
        let mut session = MasterSession::default();
        session.send(&read_holding(Protocol::Tcp, 0)).unwrap();
        let error = session.transport_failed(TransportError::Disconnected("peer closed".into()));
        assert!(matches!(error, ModbusError::Transport(TransportError::Disconnected(_))));
        assert!(!session.is_pending());
    }

    #[test]
    fn invalid_request_leaves_session_idle() {
        let mut session = MasterSession::default();
        let invalid = RequestDescriptor::read(Protocol::Tcp, 1, FunctionCode::ReadCoils, 0, 2001);
        assert!(matches!(session.send(&invalid), Err(ModbusError::Request(_))));
        assert!(!session.is_pending());
        assert!(session.context().is_none());
        assert_eq!(session.next_transaction_id(), 1);
    }

    #[test]
    fn reset() {
        let mut session = MasterSession::default();
        session.send(&read_holding(Protocol::Tcp, 0)).unwrap();
        session.reset();
        assert!(!session.is_pending());
        assert!(session.context().is_none());
    }
}
