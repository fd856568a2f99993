use xmlink_channel::{Baud, SerialPort};
use xmlink_frame::{FrameWriter, Opcode};

use crate::cmd::SendArgs;
use crate::exit::{channel_error, frame_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let opcode = resolve_opcode(&args)?;
    let payload = args.data.as_deref().map(parse_hex).transpose()?;

    let baud =
        Baud::from_rate(args.baud).map_err(|err| channel_error("invalid baud rate", err))?;
    let stream = SerialPort::open(&args.device, baud)
        .map_err(|err| channel_error("failed to open device", err))?;

    let mut writer = FrameWriter::new(stream);
    writer
        .send(opcode, payload.as_deref())
        .map_err(|err| frame_error("send failed", err))?;

    Ok(SUCCESS)
}

fn resolve_opcode(args: &SendArgs) -> CliResult<Opcode> {
    if let Some(name) = &args.command {
        let profile = args.profile.build();
        return profile
            .commands()
            .resolve(name)
            .ok_or_else(|| CliError::new(USAGE, format!("unregistered command name: {name}")));
    }
    if let Some(raw) = &args.raw {
        return parse_byte(raw).map(Opcode::new);
    }
    Err(CliError::new(USAGE, "one of --command or --raw is required"))
}

fn parse_byte(input: &str) -> CliResult<u8> {
    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| CliError::new(DATA_INVALID, format!("invalid opcode byte: {input}")))
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let input = input.trim();
    if input.len() % 2 != 0 {
        return Err(CliError::new(
            DATA_INVALID,
            "payload hex must have an even number of digits",
        ));
    }
    // Pair up raw bytes rather than slicing the str, so non-ASCII input
    // falls out as a parse error instead of a char-boundary panic.
    input
        .as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(|| {
                    CliError::new(DATA_INVALID, format!("invalid payload hex: {input}"))
                })
        })
        .collect()
}
