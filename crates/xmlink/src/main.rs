mod cmd;
mod exit;
mod logging;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "xmlink", version, about = "XMega serial link driver")]
struct Cli {
    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match cmd::run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::try_parse_from([
            "xmlink",
            "run",
            "/dev/ttyUSB0",
            "--baud",
            "230400",
            "--profile",
            "towbot",
        ])
        .expect("run args should parse");

        assert!(matches!(cli.command, Command::Run(_)));
    }

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "xmlink",
            "send",
            "/dev/ttyUSB0",
            "--command",
            "motors",
            "--data",
            "0102",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.command.as_deref(), Some("motors"));
                assert_eq!(args.data.as_deref(), Some("0102"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_command_and_raw_together() {
        let err = Cli::try_parse_from([
            "xmlink",
            "send",
            "/dev/ttyUSB0",
            "--command",
            "motors",
            "--raw",
            "0x80",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn run_defaults_to_towbot_profile() {
        let cli = Cli::try_parse_from(["xmlink", "run", "/dev/ttyUSB0"])
            .expect("run args should parse");

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.baud, 115_200);
                assert!(matches!(args.profile, cmd::ProfileKind::Towbot));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
