use tracing::{debug, warn};

use crate::{
    consts::*,
    context::RequestContext,
    encoding::{DecodeResult, Decoder},
    error::DecodeError,
    function_code::FunctionCode,
    modbus_exception::ExceptionResult,
    protocol::{Adu, Protocol},
    value::{ParsedValue, Response, Value},
};

/// Decodes one complete response buffer against the context of the request it
/// answers.
///
/// Framing is checked first (MBAP header for TCP, CRC for RTU). A function
/// code with the high bit set yields [`Response::Exception`]; anything the
/// decoder cannot make sense of is a [`DecodeError`].
pub fn decode(buffer: &[u8], context: Option<&RequestContext>, protocol: Protocol) -> DecodeResult<Response> {
    let context = context.ok_or(DecodeError::MissingContext)?;
    let adu = protocol.open(buffer)?;
    check_identity(&adu, context);

    let mut decoder = Decoder::new(adu.pdu);
    let function_code = FunctionCode::from(decoder.read_u8()?);

    if let FunctionCode::Error(_) = function_code {
        let exception_code = decoder.read_u8()?;
        finish(&decoder)?;
        let exception = ExceptionResult {
            function_code,
            exception_code,
        };
        warn!("{exception}");
        return Ok(Response::Exception(exception));
    }

    if function_code != context.function_code {
        return Err(DecodeError::FunctionMismatch {
            expected: context.function_code,
            actual: function_code,
        });
    }

    let values = match function_code {
        FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => decode_bits(&mut decoder, context)?,
        FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => decode_registers(&mut decoder, context)?,
        FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleHoldingRegister => decode_echo(&mut decoder, context, function_code)?,
        _ => return Err(DecodeError::InvalidData("Unsupported function code")),
    };

    Ok(Response::Values(values))
}

fn check_identity(adu: &Adu, context: &RequestContext) {
    if adu.unit_id != context.unit_id {
        warn!("Response from unit {} but request was sent to unit {}", adu.unit_id, context.unit_id);
    }
    if let (Some(received), Some(sent)) = (adu.transaction_id, context.transaction_id) {
        if received != sent {
            warn!("Response carries transaction id {received} but request used {sent}");
        }
    }
}

fn decode_bits(decoder: &mut Decoder, context: &RequestContext) -> DecodeResult<Vec<ParsedValue>> {
    let quantity = context.quantity as usize;
    let byte_count = decoder.read_u8()? as usize;
    let expected = quantity.div_ceil(8);
    if byte_count != expected {
        return Err(DecodeError::ByteCountMismatch {
            expected,
            actual: byte_count,
        });
    }

    let data = decoder.read_bytes(byte_count)?;
    finish(decoder)?;

    let bits = Decoder::new(data).read_bools(quantity)?;
    Ok(bits
        .into_iter()
        .enumerate()
        .map(|(offset, on)| ParsedValue::new(context.start_address.wrapping_add(offset as u16), Value::Bit(on)))
        .collect())
}

fn decode_registers(decoder: &mut Decoder, context: &RequestContext) -> DecodeResult<Vec<ParsedValue>> {
    let quantity = context.quantity as usize;
    let byte_count = decoder.read_u8()? as usize;
    let expected = quantity * 2;
    if byte_count > expected {
        return Err(DecodeError::ByteCountMismatch {
            expected,
            actual: byte_count,
        });
    }

    let data = decoder.read_bytes(byte_count)?;
    finish(decoder)?;

    let registers = Decoder::new(data).read_registers(quantity);
    if registers.len() < quantity {
        debug!("Response holds {} of {quantity} registers", registers.len());
    }

    Ok(registers
        .into_iter()
        .enumerate()
        .map(|(offset, value)| ParsedValue::new(context.start_address.wrapping_add(offset as u16), Value::Register(value)))
        .collect())
}

/// Single writes answer with the address and value they stored.
fn decode_echo(decoder: &mut Decoder, context: &RequestContext, function_code: FunctionCode) -> DecodeResult<Vec<ParsedValue>> {
    let address = decoder.read_u16()?;
    let value = decoder.read_u16()?;
    finish(decoder)?;

    if address != context.start_address {
        return Err(DecodeError::EchoMismatch {
            expected: context.start_address,
            actual: address,
        });
    }

    let value = match (function_code, value) {
        (FunctionCode::WriteSingleCoil, COIL_ON) => Value::Bit(true),
        (FunctionCode::WriteSingleCoil, COIL_OFF) => Value::Bit(false),
        (FunctionCode::WriteSingleCoil, _) => return Err(DecodeError::InvalidData("Coil echo is neither ON nor OFF")),
        (_, value) => Value::Register(value),
    };

    Ok(vec![ParsedValue::new(address, value)])
}

fn finish(decoder: &Decoder) -> DecodeResult<()> {
    if decoder.remaining() > 0 {
        return Err(DecodeError::InvalidData("Trailing bytes after data"));
    }
    Ok(())
}
