use crate::{
    consts::*,
    encoding::{Encodable, Encoder},
    error::RequestError,
    function_code::FunctionCode,
    protocol::Protocol,
};

/// The second field of every supported request: a count for reads, the value
/// to store for single writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Quantity(u16),
    Value(u16),
}

/// Everything needed to build one request frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub protocol: Protocol,
    pub slave_id: u8,
    pub function_code: FunctionCode,
    pub start_address: u16,
    pub payload: Payload,
}

impl RequestDescriptor {
    pub fn read(protocol: Protocol, slave_id: u8, function_code: FunctionCode, start_address: u16, quantity: u16) -> Self {
        Self {
            protocol,
            slave_id,
            function_code,
            start_address,
            payload: Payload::Quantity(quantity),
        }
    }

    pub fn write_single_coil(protocol: Protocol, slave_id: u8, address: u16, value: bool) -> Self {
        Self {
            protocol,
            slave_id,
            function_code: FunctionCode::WriteSingleCoil,
            start_address: address,
            payload: Payload::Value(if value { COIL_ON } else { COIL_OFF }),
        }
    }

    pub fn write_single_register(protocol: Protocol, slave_id: u8, address: u16, value: u16) -> Self {
        Self {
            protocol,
            slave_id,
            function_code: FunctionCode::WriteSingleHoldingRegister,
            start_address: address,
            payload: Payload::Value(value),
        }
    }

    /// Builds a descriptor from the flat configuration form, where both
    /// `quantity` and `value` are present and the function code decides which
    /// one is sent.
    pub fn from_config(protocol: Protocol, slave_id: u8, function_code: &str, start_address: u16, quantity: u16, value: u16) -> Result<Self, RequestError> {
        let function_code: FunctionCode = function_code.parse()?;
        let payload = if function_code.is_write() {
            Payload::Value(value)
        } else {
            Payload::Quantity(quantity)
        };
        let descriptor = Self {
            protocol,
            slave_id,
            function_code,
            start_address,
            payload,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Number of addresses covered. Single writes cover one.
    pub fn quantity(&self) -> u16 {
        match self.payload {
            Payload::Quantity(quantity) => quantity,
            Payload::Value(_) => 1,
        }
    }

    fn second_field(&self) -> u16 {
        match self.payload {
            Payload::Quantity(value) | Payload::Value(value) => value,
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        let function = self.function_code;
        match self.payload {
            Payload::Quantity(quantity) if function.is_read() => {
                let max = function.max_quantity().unwrap_or(u16::MAX);
                if quantity == 0 || quantity > max {
                    return Err(RequestError::QuantityOutOfRange { function, quantity, max });
                }
                u16::checked_add(self.start_address, quantity - 1).ok_or(RequestError::AddressOverflow {
                    address: self.start_address,
                    quantity,
                })?;
                Ok(())
            }
            Payload::Value(value) if function.is_write() => {
                if function == FunctionCode::WriteSingleCoil && value != COIL_ON && value != COIL_OFF {
                    return Err(RequestError::InvalidCoilValue(value));
                }
                Ok(())
            }
            _ if !function.is_read() && !function.is_write() => Err(RequestError::UnsupportedFunction(function.to_string())),
            _ => Err(RequestError::PayloadMismatch(function)),
        }
    }
}

/// Slave id, function code, start address and the second field. The same six
/// bytes for every supported function.
impl Encodable for RequestDescriptor {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_u8(self.slave_id);
        encoder.write_u8(self.function_code.into());
        encoder.write_u16(self.start_address);
        encoder.write_u16(self.second_field());
    }
}

/// Parses a coil state: `on`, `off`, `true`, `false`, `1`, `0`, or the raw
/// `0xFF00` / `0x0000` words.
pub fn parse_coil_value(input: &str) -> Result<u16, RequestError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(COIL_ON),
        "off" | "false" | "0" => Ok(COIL_OFF),
        other => match parse_register_value(other)? {
            value @ (COIL_ON | COIL_OFF) => Ok(value),
            value => Err(RequestError::InvalidCoilValue(value)),
        },
    }
}

/// Parses a register value as unsigned, signed 16-bit or `0x` hex.
pub fn parse_register_value(input: &str) -> Result<u16, RequestError> {
    let trimmed = input.trim();
    let parsed = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else if trimmed.starts_with('-') {
        trimmed.parse::<i16>().ok().map(|v| v as u16)
    } else {
        trimmed.parse::<u16>().ok()
    };
    parsed.ok_or_else(|| RequestError::InvalidValue(input.to_string()))
}
