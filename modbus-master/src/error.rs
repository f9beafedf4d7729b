use std::sync::Arc;

use thiserror::Error;

use crate::function_code::FunctionCode;

/// A request that was rejected before any bytes were produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Unsupported function code '{0}', expected 01 to 06")]
    UnsupportedFunction(String),
    #[error("Quantity {quantity} out of range, {function} allows 1 to {max}")]
    QuantityOutOfRange { function: FunctionCode, quantity: u16, max: u16 },
    #[error("Address {address} + quantity {quantity} exceeds device address space")]
    AddressOverflow { address: u16, quantity: u16 },
    #[error("Coil value {0:#06X} is neither ON (0xFF00) nor OFF (0x0000)")]
    InvalidCoilValue(u16),
    #[error("Invalid value '{0}'")]
    InvalidValue(String),
    #[error("Function {0} takes a quantity for reads and a value for writes")]
    PayloadMismatch(FunctionCode),
}

/// The response could not be interpreted. Distinct from a device exception.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Response is truncated")]
    MissingData,
    #[error("Invalid response: {0}")]
    InvalidData(&'static str),
    #[error("No request context, nothing was sent before this response")]
    MissingContext,
    #[error("CRC mismatch, expected {expected:#06X} but frame carries {actual:#06X}")]
    CrcMismatch { expected: u16, actual: u16 },
    #[error("Function code mismatch, sent {expected} but received {actual}")]
    FunctionMismatch { expected: FunctionCode, actual: FunctionCode },
    #[error("Byte count mismatch, expected {expected} but response declares {actual}")]
    ByteCountMismatch { expected: usize, actual: usize },
    #[error("Echoed address {actual} does not match requested address {expected}")]
    EchoMismatch { expected: u16, actual: u16 },
}

/// Failures reported by the transport. The engine never produces these itself.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Timeout waiting for response")]
    Timeout,
    #[error("Disconnected: {0}")]
    Disconnected(String),
    #[error("{0}")]
    IO(Arc<std::io::Error>),
}

impl From<std::io::Error> for TransportError {
    fn from(value: std::io::Error) -> Self {
        Self::IO(Arc::new(value))
    }
}

/// Errors returned by the [`MasterSession`](crate::MasterSession).
#[derive(Error, Debug, Clone)]
pub enum ModbusError {
    #[error("Request rejected: {0}")]
    Request(#[from] RequestError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A previous request is still waiting for its response.
    #[error("A request is already pending")]
    RequestPending,
}
