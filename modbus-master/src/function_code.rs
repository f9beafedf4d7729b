use std::{fmt::Display, str::FromStr};

use crate::{consts::*, error::RequestError};

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum FunctionCode {
    ReadCoils = 1,
    ReadDiscreteInputs = 2,
    ReadHoldingRegisters = 3,
    ReadInputRegisters = 4,
    WriteSingleCoil = 5,
    WriteSingleHoldingRegister = 6,
    Error(u8),
    Unknown(u8),
}

/// How the data region of a response is laid out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    /// Bit-packed, least significant bit first.
    Bits,
    /// Big-endian 16-bit words.
    Registers,
}

impl FunctionCode {
    pub const SUPPORTED: [FunctionCode; 6] = [
        FunctionCode::ReadCoils,
        FunctionCode::ReadDiscreteInputs,
        FunctionCode::ReadHoldingRegisters,
        FunctionCode::ReadInputRegisters,
        FunctionCode::WriteSingleCoil,
        FunctionCode::WriteSingleHoldingRegister,
    ];

    pub fn is_read(self) -> bool {
        matches!(
            self,
            Self::ReadCoils | Self::ReadDiscreteInputs | Self::ReadHoldingRegisters | Self::ReadInputRegisters
        )
    }

    pub fn is_write(self) -> bool {
        matches!(self, Self::WriteSingleCoil | Self::WriteSingleHoldingRegister)
    }

    pub fn value_kind(self) -> Option<ValueKind> {
        match self {
            Self::ReadCoils | Self::ReadDiscreteInputs | Self::WriteSingleCoil => Some(ValueKind::Bits),
            Self::ReadHoldingRegisters | Self::ReadInputRegisters | Self::WriteSingleHoldingRegister => Some(ValueKind::Registers),
            Self::Error(_) | Self::Unknown(_) => None,
        }
    }

    /// Largest quantity a single read may request.
    pub fn max_quantity(self) -> Option<u16> {
        match self {
            Self::ReadCoils => Some(READ_COILS_MAX_LEN),
            Self::ReadDiscreteInputs => Some(READ_DISCRETE_INPUTS_MAX_LEN),
            Self::ReadHoldingRegisters => Some(READ_HOLDING_REGISTERS_MAX_LEN),
            Self::ReadInputRegisters => Some(READ_INPUT_REGISTERS_MAX_LEN),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadCoils => "Read Coils",
            Self::ReadDiscreteInputs => "Read Discrete Inputs",
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::ReadInputRegisters => "Read Input Registers",
            Self::WriteSingleCoil => "Write Single Coil",
            Self::WriteSingleHoldingRegister => "Write Single Register",
            Self::Error(_) => "Exception",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl From<u8> for FunctionCode {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::ReadCoils,
            2 => Self::ReadDiscreteInputs,
            3 => Self::ReadHoldingRegisters,
            4 => Self::ReadInputRegisters,
            5 => Self::WriteSingleCoil,
            6 => Self::WriteSingleHoldingRegister,
            // 0x80 alone carries no function to refer to
            _ if value > EXCEPTION_FLAG => Self::Error(value),
            _ => Self::Unknown(value),
        }
    }
}

impl From<FunctionCode> for u8 {
    fn from(value: FunctionCode) -> Self {
        match value {
            FunctionCode::ReadCoils => 1,
            FunctionCode::ReadDiscreteInputs => 2,
            FunctionCode::ReadHoldingRegisters => 3,
            FunctionCode::ReadInputRegisters => 4,
            FunctionCode::WriteSingleCoil => 5,
            FunctionCode::WriteSingleHoldingRegister => 6,
            FunctionCode::Error(value) => value,
            FunctionCode::Unknown(value) => value,
        }
    }
}

impl PartialEq for FunctionCode {
    fn eq(&self, other: &Self) -> bool {
        u8::from(*self) == u8::from(*other)
    }
}

impl Eq for FunctionCode {}

/// Two-digit form used in configuration, e.g. `03`.
impl Display for FunctionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}", u8::from(*self))
    }
}

/// Accepts `03`, `3` and `0x03`. Only the six supported codes parse.
impl FromStr for FunctionCode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => trimmed.parse::<u8>(),
        };
        match parsed.map(FunctionCode::from) {
            Ok(code) if code.is_read() || code.is_write() => Ok(code),
            _ => Err(RequestError::UnsupportedFunction(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_strings() {
        assert_eq!("01".parse(), Ok(FunctionCode::ReadCoils));
        assert_eq!("3".parse(), Ok(FunctionCode::ReadHoldingRegisters));
        assert_eq!("0x06".parse(), Ok(FunctionCode::WriteSingleHoldingRegister));
        assert!("07".parse::<FunctionCode>().is_err());
        assert!("16".parse::<FunctionCode>().is_err());
        assert!("0x83".parse::<FunctionCode>().is_err());
        assert!("".parse::<FunctionCode>().is_err());
    }

    #[test]
    fn display_round_trips_config_form() {
        for code in FunctionCode::SUPPORTED {
            assert_eq!(code.to_string().parse(), Ok(code));
        }
        assert_eq!(FunctionCode::ReadInputRegisters.to_string(), "04");
    }

    #[test]
    fn exception_flag() {
        assert_eq!(FunctionCode::from(0x83), FunctionCode::Error(0x83));
        assert_eq!(FunctionCode::from(0x81), FunctionCode::Error(0x81));
        assert!(matches!(FunctionCode::from(0x80), FunctionCode::Unknown(0x80)));
        assert_eq!(FunctionCode::from(0x41), FunctionCode::Unknown(0x41));
    }
}
