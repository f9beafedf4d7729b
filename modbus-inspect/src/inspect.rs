use std::error::Error;

use clap::Parser;
use comfy_table::{presets, CellAlignment, Table};
use modbus_master::{
    hex::{parse_hex, to_hex},
    parse_coil_value, parse_register_value, Frame, FunctionCode, MasterConfig, MasterSession, ParsedValue, Protocol, Response,
    TransportConfig, TransportError, Value, ValueKind,
};
use rustyline::{completion::Completer, history::MemHistory, Editor, Helper, Highlighter, Hinter, Validator};
use tracing::info;

use crate::args::*;

const PROMPT: &str = "modbus-inspect> ";

pub fn run(args: Cli) -> Result<(), Box<dyn Error>> {
    let mut inspector = Inspector::new(&args);

    inspector.command_loop()?;

    Ok(())
}

struct Inspector {
    config: MasterConfig,
    tcp: TransportConfig,
    rtu: TransportConfig,
    session: MasterSession,
    last_table: Option<Table>,
}

impl Inspector {
    fn new(args: &Cli) -> Self {
        let tcp = TransportConfig::Tcp {
            host: args.host.clone(),
            port: args.port,
        };
        let rtu = TransportConfig::Rtu {
            serial_port: args.serial_port.clone(),
            baud_rate: args.baud_rate,
        };
        let transport = match Protocol::from(args.protocol) {
            Protocol::Tcp => tcp.clone(),
            Protocol::Rtu => rtu.clone(),
        };
        let config = MasterConfig {
            transport,
            slave_id: args.unit_id,
            timeout: args.timeout,
            ..Default::default()
        };

        Self {
            session: MasterSession::from_config(&config),
            config,
            tcp,
            rtu,
            last_table: None,
        }
    }

    fn command_loop(&mut self) -> Result<(), Box<dyn Error>> {
        println!("protocol = {}", self.config.protocol());
        println!("unit-id = {}", self.config.slave_id);
        println!();

        let config = rustyline::Config::builder().build();
        let helper = InteractiveHelper {};

        let mut rl = Editor::<InteractiveHelper, MemHistory>::with_history(config, MemHistory::new())?;
        rl.set_helper(Some(helper));

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    _ = rl.add_history_entry(line.as_str());

                    println!();

                    let result = self.handle_command(line);

                    if let Ok(true) = result {
                        return Ok(());
                    }

                    if let Err(err) = result {
                        println!("{err}");
                    }

                    println!();
                }
                Err(_) => break,
            }
        }

        Ok(())
    }

    fn handle_command(&mut self, line: String) -> Result<bool, Box<dyn Error>> {
        let words = shellwords::split(&format!("{PROMPT}{line}"))?;

        let cmd = Interactive::try_parse_from(words)?;

        match &cmd.command {
            InteractiveCommands::Build(args) => self.build(args)?,
            InteractiveCommands::Decode(args) => self.decode(args)?,
            InteractiveCommands::Cancel => self.cancel(),
            InteractiveCommands::Status => self.status(),
            InteractiveCommands::Export(args) => self.export_csv(args)?,
            InteractiveCommands::Set(args) => match args.command {
                SetCommands::Protocol { protocol } => {
                    self.config.transport = match Protocol::from(protocol) {
                        Protocol::Tcp => self.tcp.clone(),
                        Protocol::Rtu => self.rtu.clone(),
                    };
                    println!("protocol = {}", self.config.protocol());
                }
                SetCommands::UnitId { unit_id } => {
                    self.config.slave_id = unit_id;
                    println!("unit-id = {unit_id}");
                }
                SetCommands::TransactionId { transaction_id } => {
                    self.session.set_next_transaction_id(transaction_id);
                    println!("transaction-id = {transaction_id}");
                }
                SetCommands::Timeout { timeout } => {
                    self.config.timeout = timeout;
                    self.session.set_timeout(timeout);
                    println!("timeout = {}ms", timeout.as_millis());
                }
            },
            InteractiveCommands::Exit => return Ok(true),
        }

        Ok(false)
    }

    fn build(&mut self, args: &BuildArgs) -> Result<(), Box<dyn Error>> {
        let function: FunctionCode = args.function.parse()?;
        let argument = args.argument.as_deref();

        self.config.function_code = function.to_string();
        self.config.start_address = args.address;
        match function {
            FunctionCode::WriteSingleCoil => self.config.value = parse_coil_value(argument.unwrap_or("on"))?,
            FunctionCode::WriteSingleHoldingRegister => self.config.value = parse_register_value(argument.unwrap_or("0"))?,
            _ => self.config.quantity = argument.map(parse_u16).transpose()?.unwrap_or(1),
        }

        let request = self.config.request()?;
        let frame = self.session.send_with_transaction_id(&request, args.transaction_id)?;
        info!("Built {} request for unit {}", function.name(), request.slave_id);

        let mut table = Table::new();
        table.load_preset(presets::NOTHING);
        table.set_header(["Field", "Bytes", "Value"]);
        table.column_iter_mut().skip(2).for_each(|c| c.set_cell_alignment(CellAlignment::Right));
        for row in frame_rows(&frame) {
            table.add_row(row);
        }

        println!("[TX] {frame}");
        println!();
        println!("{table}");

        self.last_table = Some(table);

        Ok(())
    }

    fn decode(&mut self, args: &DecodeArgs) -> Result<(), Box<dyn Error>> {
        let bytes = parse_hex(&args.bytes.join(" "))?;
        let kind = self.session.context().and_then(|c| c.function_code.value_kind());

        println!("[RX] {}", to_hex(&bytes));
        println!();

        match self.session.receive(&bytes)? {
            Response::Values(values) => {
                let table = match kind {
                    Some(ValueKind::Bits) => bits_table(&values),
                    _ => registers_table(&values),
                };
                println!("{table}");
                self.last_table = Some(table);
            }
            Response::Exception(exception) => {
                println!("{exception}");
            }
        }

        Ok(())
    }

    fn cancel(&mut self) {
        if !self.session.is_pending() {
            println!("Nothing pending");
            return;
        }
        let err = self.session.transport_failed(TransportError::Timeout);
        println!("{err}");
    }

    fn status(&mut self) {
        let mut table = Table::new();
        table.load_preset(presets::NOTHING);
        table.set_header(["Setting", "Value"]);

        table.add_row(["Protocol".to_string(), self.config.protocol().to_string()]);
        table.add_row(["Unit id".to_string(), self.config.slave_id.to_string()]);
        table.add_row(["Transport".to_string(), self.config.transport.to_string()]);
        if self.config.protocol() == Protocol::Tcp {
            table.add_row(["Next transaction id".to_string(), self.session.next_transaction_id().to_string()]);
        }
        table.add_row(["Timeout".to_string(), format!("{}ms", self.session.timeout().as_millis())]);
        table.add_row(["Pending".to_string(), self.session.is_pending().to_string()]);
        if let Some(context) = self.session.context() {
            table.add_row([
                "Last request".to_string(),
                format!(
                    "{} {} @ {} x {}",
                    context.function_code,
                    context.function_code.name(),
                    context.start_address,
                    context.quantity
                ),
            ]);
        }

        println!("{table}");

        self.last_table = Some(table);
    }

    fn export_csv(&self, args: &ExportArgs) -> Result<(), Box<dyn Error>> {
        let table = match &self.last_table {
            Some(table) => table,
            None => {
                println!("Nothing to export");
                return Ok(());
            }
        };

        let mut writer = csv::Writer::from_path(&args.filename)?;

        if let Some(header) = table.header() {
            writer.write_record(header.cell_iter().map(|c| c.content()))?;
        }

        for row in table.row_iter() {
            writer.write_record(row.cell_iter().map(|c| c.content()))?;
        }
        writer.flush()?;

        println!("Exported");

        Ok(())
    }
}

/// Splits a request frame into its named fields.
fn frame_rows(frame: &Frame) -> Vec<[String; 3]> {
    let word = |name: &str, at: usize| {
        let value = u16::from_be_bytes([frame[at], frame[at + 1]]);
        [name.to_string(), to_hex(&frame[at..at + 2]), value.to_string()]
    };
    let byte = |name: &str, at: usize| [name.to_string(), to_hex(&frame[at..at + 1]), frame[at].to_string()];

    let mut rows = Vec::with_capacity(8);
    let function_at = frame.protocol().function_code_offset();
    let function = FunctionCode::from(frame[function_at]);

    match frame.protocol() {
        Protocol::Tcp => {
            rows.push(word("Transaction id", 0));
            rows.push(word("Protocol id", 2));
            rows.push(word("Length", 4));
            rows.push(byte("Unit id", 6));
        }
        Protocol::Rtu => rows.push(byte("Slave id", 0)),
    }

    rows.push([
        "Function".to_string(),
        to_hex(&frame[function_at..function_at + 1]),
        function.name().to_string(),
    ]);
    rows.push(word("Address", function_at + 1));
    rows.push(word(if function.is_write() { "Value" } else { "Quantity" }, function_at + 3));

    if frame.protocol() == Protocol::Rtu {
        let at = function_at + 5;
        let crc = u16::from_le_bytes([frame[at], frame[at + 1]]);
        rows.push(["CRC".to_string(), to_hex(&frame[at..at + 2]), format!("{crc:#06X}")]);
    }

    rows
}

fn bits_table(values: &[ParsedValue]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(["Address", "State", "Hex"]);

    for value in values {
        table.add_row([value.address.to_string(), value.value.to_string(), value.hex.clone()]);
    }

    table
}

fn registers_table(values: &[ParsedValue]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(["Address", "U16", "I16", "Hex", "Bin"]);
    table.column_iter_mut().skip(1).take(2).for_each(|c| c.set_cell_alignment(CellAlignment::Right));

    for value in values {
        let raw = match value.value {
            Value::Register(raw) => raw,
            Value::Bit(on) => on as u16,
        };
        table.add_row([
            value.address.to_string(),
            value.value.to_string(),
            (raw as i16).to_string(),
            value.hex.clone(),
            format!("{:04b} {:04b} {:04b} {:04b}", raw >> 12 & 0xF, raw >> 8 & 0xF, raw >> 4 & 0xF, raw & 0xF),
        ]);
    }

    table
}

#[derive(Helper, Hinter, Validator, Highlighter)]
struct InteractiveHelper {}
const COMPLETIONS: [&str; 12] = [
    "build ",
    "decode ",
    "cancel",
    "status",
    "set protocol ",
    "set unit-id ",
    "set transaction-id ",
    "set timeout ",
    "export ",
    "help",
    "exit",
    "build --transaction-id ",
];

impl Completer for InteractiveHelper {
    type Candidate = String;

    fn complete(&self, line: &str, pos: usize, ctx: &rustyline::Context<'_>) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let mut matches = vec![];

        for cmd in COMPLETIONS {
            if cmd.starts_with(line) && pos <= cmd.len() {
                matches.push(String::from(&cmd[pos..]));
            }
        }

        let _ = ctx;
        Ok((pos, matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modbus_master::RequestDescriptor;
    use std::time::Duration;

    fn cli(protocol: ProtocolArg) -> Cli {
        Cli::parse_from(["modbus-inspect", "--protocol", if protocol == ProtocolArg::Tcp { "tcp" } else { "rtu" }])
    }

    #[test]
    fn rtu_frame_rows() {
        let mut session = MasterSession::default();
        let frame = session
            .send(&RequestDescriptor::read(Protocol::Rtu, 1, FunctionCode::ReadHoldingRegisters, 0, 10))
            .unwrap();
        let rows = frame_rows(&frame);
        let names: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, ["Slave id", "Function", "Address", "Quantity", "CRC"]);
        assert_eq!(rows[4], ["CRC".to_string(), "C5 CD".to_string(), "0xCDC5".to_string()]);
    }

    #[test]
    fn tcp_frame_rows() {
        let mut session = MasterSession::default();
        let frame = session.send(&RequestDescriptor::write_single_coil(Protocol::Tcp, 1, 0xAC, true)).unwrap();
        let rows = frame_rows(&frame);
        let names: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, ["Transaction id", "Protocol id", "Length", "Unit id", "Function", "Address", "Value"]);
        assert_eq!(rows[2][2], "6");
        assert_eq!(rows[4][2], "Write Single Coil");
        assert_eq!(rows[6][1], "FF 00");
    }

    #[test]
    fn build_then_decode() {
        let mut inspector = Inspector::new(&cli(ProtocolArg::Rtu));
        assert_eq!(inspector.handle_command("build 03 0 2".into()).unwrap(), false);
        assert!(inspector.session.is_pending());

        // Second build is refused until the first one is answered.
        assert!(inspector.handle_command("build 03 0 2".into()).is_err());

        let mut reply = vec![0x01u8, 0x03, 0x04, 0x00, 0x0A, 0x01, 0x2C];
        reply.extend(modbus_master::crc16(&reply).to_le_bytes());
        inspector.handle_command(format!("decode {}", to_hex(&reply))).unwrap();
        assert!(!inspector.session.is_pending());

        let table = inspector.last_table.as_ref().unwrap();
        let first: Vec<String> = table.row_iter().next().unwrap().cell_iter().map(|c| c.content()).collect();
        assert_eq!(first[..4], ["0", "10", "10", "000A"]);
    }

    #[test]
    fn cancel_and_settings() {
        let mut inspector = Inspector::new(&cli(ProtocolArg::Tcp));
        inspector.handle_command("set transaction-id 0x10".into()).unwrap();
        inspector.handle_command("build 01 0 16".into()).unwrap();
        assert_eq!(inspector.session.context().and_then(|c| c.transaction_id), Some(16));

        inspector.handle_command("cancel".into()).unwrap();
        assert!(!inspector.session.is_pending());

        inspector.handle_command("set protocol rtu".into()).unwrap();
        inspector.handle_command("set unit-id 7".into()).unwrap();
        assert_eq!(inspector.config.protocol(), Protocol::Rtu);
        assert_eq!(inspector.config.transport.to_string(), "COM1 @ 9600");

        inspector.handle_command("build 05 3 off".into()).unwrap();
        let context = inspector.session.context().unwrap();
        assert_eq!(context.unit_id, 7);
        assert_eq!(context.function_code, FunctionCode::WriteSingleCoil);

        inspector.handle_command("set timeout 500".into()).unwrap();
        assert_eq!(inspector.session.timeout(), Duration::from_millis(500));
        assert_eq!(inspector.config.timeout, Duration::from_millis(500));
        assert!(inspector.handle_command("set timeout soon".into()).is_err());

        assert_eq!(inspector.handle_command("exit".into()).unwrap(), true);
    }
}
