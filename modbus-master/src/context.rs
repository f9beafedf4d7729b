use crate::{function_code::FunctionCode, request::RequestDescriptor};

/// What the decoder needs to know about the request a response answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestContext {
    pub function_code: FunctionCode,
    pub start_address: u16,
    /// Requested count for reads, 1 for single writes.
    pub quantity: u16,
    /// Only used for diagnostics.
    pub unit_id: u8,
    /// TCP only. Logged when the response echoes a different one, never enforced.
    pub transaction_id: Option<u16>,
}

impl RequestContext {
    pub fn new(descriptor: &RequestDescriptor, transaction_id: Option<u16>) -> Self {
        Self {
            function_code: descriptor.function_code,
            start_address: descriptor.start_address,
            quantity: descriptor.quantity(),
            unit_id: descriptor.slave_id,
            transaction_id,
        }
    }
}

/// Single slot holding the context of the most recent send.
///
/// Overwritten on every send and read, not consumed, on every decode. This is
/// not a correlation table: it is only sound while at most one request is
/// outstanding.
#[derive(Debug, Default)]
pub struct ContextTracker {
    last: Option<RequestContext>,
}

impl ContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, context: RequestContext) {
        self.last = Some(context);
    }

    pub fn current(&self) -> Option<&RequestContext> {
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;

    #[test]
    fn record_overwrites() {
        let mut tracker = ContextTracker::new();
        assert!(tracker.current().is_none());

        let first = RequestDescriptor::read(Protocol::Tcp, 1, FunctionCode::ReadCoils, 10, 8);
        tracker.record(RequestContext::new(&first, Some(1)));
        assert_eq!(tracker.current().map(|c| c.start_address), Some(10));

        let second = RequestDescriptor::write_single_register(Protocol::Tcp, 1, 20, 7);
        tracker.record(RequestContext::new(&second, Some(2)));
        let current = tracker.current().unwrap();
        assert_eq!(current.function_code, FunctionCode::WriteSingleHoldingRegister);
        assert_eq!(current.start_address, 20);
        assert_eq!(current.quantity, 1);
        assert_eq!(current.transaction_id, Some(2));

        // Reading does not consume.
        assert!(tracker.current().is_some());
        tracker.clear();
        assert!(tracker.current().is_none());
    }
}
