use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use xmlink_node::{towbot, DeviceProfile};

use crate::exit::CliResult;

pub mod run;
pub mod send;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Attach to a device and run the link until interrupted.
    Run(RunArgs),
    /// Send a single command and exit.
    Send(SendArgs),
}

pub fn run(command: Command) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Send(args) => send::run(args),
    }
}

/// Which device profile to load.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ProfileKind {
    /// Base tables only (no handlers; diagnostics).
    Base,
    /// The towbot: nunchuck echo, wheel motors.
    Towbot,
}

impl ProfileKind {
    pub fn build(self) -> DeviceProfile {
        match self {
            ProfileKind::Base => DeviceProfile::base().build(),
            ProfileKind::Towbot => towbot::profile(),
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    pub device: PathBuf,
    /// Line speed in bits per second.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Device profile.
    #[arg(long, value_enum, default_value = "towbot")]
    pub profile: ProfileKind,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    pub device: PathBuf,
    /// Line speed in bits per second.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Device profile used to resolve the command name.
    #[arg(long, value_enum, default_value = "towbot")]
    pub profile: ProfileKind,
    /// Registered command name.
    #[arg(long, short = 'c', conflicts_with = "raw")]
    pub command: Option<String>,
    /// Raw opcode byte (decimal or 0x-prefixed hex), bypassing the registry.
    #[arg(long, conflicts_with = "command")]
    pub raw: Option<String>,
    /// Payload as hex digits (e.g. 0102).
    #[arg(long)]
    pub data: Option<String>,
}
