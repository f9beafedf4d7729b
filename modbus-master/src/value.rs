use std::fmt::Display;

use crate::modbus_exception::ExceptionResult;

/// The decoded value at one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Coils and discrete inputs, shown as `ON` / `OFF`.
    Bit(bool),
    Register(u16),
}

impl Value {
    /// Two hex digits for bits, four for registers.
    pub fn hex(&self) -> String {
        match self {
            Value::Bit(on) => format!("{:02X}", *on as u8),
            Value::Register(value) => format!("{value:04X}"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bit(true) => write!(f, "ON"),
            Value::Bit(false) => write!(f, "OFF"),
            Value::Register(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedValue {
    pub address: u16,
    pub value: Value,
    pub hex: String,
}

impl ParsedValue {
    pub fn new(address: u16, value: Value) -> Self {
        Self {
            address,
            hex: value.hex(),
            value,
        }
    }
}

/// Outcome of a successfully framed response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Values(Vec<ParsedValue>),
    /// The device rejected the request. A normal outcome, not a decode failure.
    Exception(ExceptionResult),
}

impl Response {
    pub fn values(&self) -> Option<&[ParsedValue]> {
        match self {
            Response::Values(values) => Some(values),
            Response::Exception(_) => None,
        }
    }

    pub fn exception(&self) -> Option<&ExceptionResult> {
        match self {
            Response::Values(_) => None,
            Response::Exception(exception) => Some(exception),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_display() {
        assert_eq!(ParsedValue::new(0, Value::Bit(true)).hex, "01");
        assert_eq!(ParsedValue::new(0, Value::Bit(false)).hex, "00");
        assert_eq!(ParsedValue::new(1, Value::Register(300)).hex, "012C");
        assert_eq!(Value::Register(10).hex(), "000A");
        assert_eq!(Value::Bit(true).to_string(), "ON");
        assert_eq!(Value::Bit(false).to_string(), "OFF");
        assert_eq!(Value::Register(300).to_string(), "300");
    }
}
