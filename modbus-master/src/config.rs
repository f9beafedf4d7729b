use std::{fmt::Display, time::Duration};

use crate::{consts::*, error::RequestError, protocol::Protocol, request::RequestDescriptor};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Where frames go. Opaque to the engine, only the protocol is derived from it.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportConfig {
    Tcp { host: String, port: u16 },
    Rtu { serial_port: String, baud_rate: u32 },
}

impl TransportConfig {
    pub fn protocol(&self) -> Protocol {
        match self {
            TransportConfig::Tcp { .. } => Protocol::Tcp,
            TransportConfig::Rtu { .. } => Protocol::Rtu,
        }
    }

    pub fn default_for(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Tcp => TransportConfig::Tcp {
                host: "127.0.0.1".into(),
                port: DEFAULT_TCP_PORT,
            },
            Protocol::Rtu => TransportConfig::Rtu {
                serial_port: "COM1".into(),
                baud_rate: DEFAULT_BAUD_RATE,
            },
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::default_for(Protocol::Tcp)
    }
}

impl Display for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportConfig::Tcp { host, port } => write!(f, "{host}:{port}"),
            TransportConfig::Rtu { serial_port, baud_rate } => write!(f, "{serial_port} @ {baud_rate}"),
        }
    }
}

/// The flat request form a caller configures: both `quantity` and `value`
/// are kept, the function code picks which one goes on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterConfig {
    pub transport: TransportConfig,
    pub slave_id: u8,
    /// `01` to `06`.
    pub function_code: String,
    pub start_address: u16,
    pub quantity: u16,
    pub value: u16,
    pub timeout: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            slave_id: 1,
            function_code: "03".into(),
            start_address: 0,
            quantity: 10,
            value: 0,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl MasterConfig {
    pub fn protocol(&self) -> Protocol {
        self.transport.protocol()
    }

    pub fn request(&self) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::from_config(
            self.protocol(),
            self.slave_id,
            &self.function_code,
            self.start_address,
            self.quantity,
            self.value,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{function_code::FunctionCode, request::Payload};

    #[test]
    fn default_request() {
        let config = MasterConfig::default();
        let req = config.request().unwrap();
        assert_eq!(req.protocol, Protocol::Tcp);
        assert_eq!(req.function_code, FunctionCode::ReadHoldingRegisters);
        assert_eq!(req.payload, Payload::Quantity(10));
    }

    #[test]
    fn rtu_transport() {
        let config = MasterConfig {
            transport: TransportConfig::default_for(Protocol::Rtu),
            function_code: "05".into(),
            value: COIL_ON,
            ..Default::default()
        };
        assert_eq!(config.protocol(), Protocol::Rtu);
        assert_eq!(config.transport.to_string(), "COM1 @ 9600");
        assert_eq!(config.request().unwrap().payload, Payload::Value(COIL_ON));
    }
}
