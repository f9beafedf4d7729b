use std::fmt::Display;

use crate::function_code::FunctionCode;

/// Second byte of an exception response, as defined by the Modbus
/// application protocol (codes 01-0B, 07 and 09 unassigned).
#[derive(Debug, Clone, Copy)]
pub enum ModbusException {
    IllegalFunction,
    /// Start address or address + quantity outside the device's map.
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    /// Accepted, still working. Poll again later.
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    /// The gateway answered for a device behind it that stayed silent.
    GatewayTargetDeviceFailedToRespond,
    Unknown(u8),
}

impl ModbusException {
    pub fn name(self) -> &'static str {
        match self {
            Self::IllegalFunction => "Illegal Function",
            Self::IllegalDataAddress => "Illegal Data Address",
            Self::IllegalDataValue => "Illegal Data Value",
            Self::ServerDeviceFailure => "Server Device Failure",
            Self::Acknowledge => "Acknowledge",
            Self::ServerDeviceBusy => "Server Device Busy",
            Self::MemoryParityError => "Memory Parity Error",
            Self::GatewayPathUnavailable => "Gateway Path Unavailable",
            Self::GatewayTargetDeviceFailedToRespond => "Gateway Target Device Failed To Respond",
            Self::Unknown(_) => "Unknown exception",
        }
    }
}

impl From<u8> for ModbusException {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::IllegalFunction,
            2 => Self::IllegalDataAddress,
            3 => Self::IllegalDataValue,
            4 => Self::ServerDeviceFailure,
            5 => Self::Acknowledge,
            6 => Self::ServerDeviceBusy,
            8 => Self::MemoryParityError,
            10 => Self::GatewayPathUnavailable,
            11 => Self::GatewayTargetDeviceFailedToRespond,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ModbusException> for u8 {
    fn from(value: ModbusException) -> Self {
        match value {
            ModbusException::IllegalFunction => 1,
            ModbusException::IllegalDataAddress => 2,
            ModbusException::IllegalDataValue => 3,
            ModbusException::ServerDeviceFailure => 4,
            ModbusException::Acknowledge => 5,
            ModbusException::ServerDeviceBusy => 6,
            ModbusException::MemoryParityError => 8,
            ModbusException::GatewayPathUnavailable => 10,
            ModbusException::GatewayTargetDeviceFailedToRespond => 11,
            ModbusException::Unknown(value) => value,
        }
    }
}

impl PartialEq for ModbusException {
    fn eq(&self, other: &Self) -> bool {
        u8::from(*self) == u8::from(*other)
    }
}

impl Display for ModbusException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), u8::from(*self))
    }
}

/// The device understood the request and refused it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExceptionResult {
    /// Function code as echoed by the device, high bit set.
    pub function_code: FunctionCode,
    pub exception_code: u8,
}

impl ExceptionResult {
    pub fn exception(&self) -> ModbusException {
        self.exception_code.into()
    }
}

impl Display for ExceptionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Modbus exception 0x{:02X} for function {}: {}", self.exception_code, self.function_code, self.exception())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_codes() {
        assert_eq!(ModbusException::from(2), ModbusException::IllegalDataAddress);
        assert_eq!(ModbusException::from(7), ModbusException::Unknown(7));
        assert_eq!(u8::from(ModbusException::GatewayTargetDeviceFailedToRespond), 11);
    }

    #[test]
    fn display() {
        let result = ExceptionResult {
            function_code: FunctionCode::from(0x83),
            exception_code: 0x02,
        };
        assert_eq!(result.to_string(), "Modbus exception 0x02 for function 83: Illegal Data Address (0x02)");
        assert_eq!(ModbusException::Unknown(0x33).to_string(), "Unknown exception (0x33)");
        assert_eq!(ModbusException::from(0x0B).to_string(), "Gateway Target Device Failed To Respond (0x0B)");
    }
}
