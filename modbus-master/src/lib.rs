//! Modbus master protocol engine.
//!
//! Builds request frames for Modbus/TCP and Modbus/RTU, and decodes the
//! responses back into addressed values. No I/O happens here: frames are
//! handed to a caller supplied [`Transport`], which returns complete response
//! buffers.
//!
//! ```
//! use modbus_master::{FunctionCode, MasterSession, Protocol, RequestDescriptor, Response};
//!
//! let mut session = MasterSession::default();
//! let request = RequestDescriptor::read(Protocol::Rtu, 1, FunctionCode::ReadHoldingRegisters, 0, 10);
//! let frame = session.send(&request).unwrap();
//! assert_eq!(frame.to_string(), "01 03 00 00 00 0A C5 CD");
//!
//! // An exception response: function code with the high bit set.
//! let mut reply: Vec<u8> = vec![0x01, 0x83, 0x02];
//! reply.extend(modbus_master::crc16(&reply).to_le_bytes());
//! let response = session.receive(&reply).unwrap();
//! assert!(matches!(response, Response::Exception(_)));
//! ```
mod config;
pub mod consts;
mod context;
mod crc;
mod decoder;
mod encoding;
mod error;
mod frame;
mod function_code;
pub mod hex;
mod modbus_exception;
mod protocol;
mod request;
mod session;
mod value;

pub use config::{MasterConfig, TransportConfig, DEFAULT_TIMEOUT};
pub use context::{ContextTracker, RequestContext};
pub use crc::{crc16, crc16_bitwise, verify_crc};
pub use decoder::decode;
pub use error::{DecodeError, ModbusError, RequestError, TransportError};
pub use frame::{Frame, FrameBuilder};
pub use function_code::{FunctionCode, ValueKind};
pub use modbus_exception::{ExceptionResult, ModbusException};
pub use protocol::{Adu, Protocol};
pub use request::{parse_coil_value, parse_register_value, Payload, RequestDescriptor};
pub use session::{MasterSession, Transport};
pub use value::{ParsedValue, Response, Value};
