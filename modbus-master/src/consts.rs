pub const READ_COILS_MAX_LEN: u16 = 2000;
pub const READ_DISCRETE_INPUTS_MAX_LEN: u16 = 2000;
pub const READ_HOLDING_REGISTERS_MAX_LEN: u16 = 125;
pub const READ_INPUT_REGISTERS_MAX_LEN: u16 = 125;

/// Transaction id, protocol id, length and unit id.
pub const MBAP_HEADER_LEN: usize = 7;
pub const TCP_PROTOCOL_ID: u16 = 0;

/// Slave id, function code and the two checksum bytes.
pub const RTU_MIN_FRAME_LEN: usize = 5;

pub const COIL_ON: u16 = 0xFF00;
pub const COIL_OFF: u16 = 0x0000;

pub const EXCEPTION_FLAG: u8 = 0x80;

pub const DEFAULT_TCP_PORT: u16 = 502;
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];
