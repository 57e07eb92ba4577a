use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::call::CallDirection;

#[derive(Parser, Debug)]
#[command(name = "softdial")]
#[command(about = "Softphone dialer demo with call recording", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Log in with a phone number and the demo OTP
    Login(LoginCliArgs),
    /// Forget the logged-in phone number
    Logout,
    /// Show the logged-in phone number
    Whoami,
    /// Place a recorded call and hang up after a fixed time
    Call(CallCliArgs),
    /// Simulate an incoming call and answer or decline it
    Incoming(IncomingCliArgs),
    /// List, export, and play past calls
    History(HistoryCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct LoginCliArgs {
    /// Phone number with country code; prompted for when omitted
    #[arg(long)]
    pub phone: Option<String>,
    /// One-time password; prompted for when omitted
    #[arg(long)]
    pub otp: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct CallCliArgs {
    /// Number to dial, e.g. +919876543210
    pub number: String,
    /// How long to stay in the call before hanging up
    #[arg(short, long, default_value = "5")]
    pub seconds: u64,
}

#[derive(ClapArgs, Debug)]
pub struct IncomingCliArgs {
    /// Decline instead of answering (logs a missed call)
    #[arg(long)]
    pub decline: bool,
    /// How long to stay in the call before hanging up
    #[arg(short, long, default_value = "5")]
    pub seconds: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Outgoing,
    Incoming,
    Missed,
}

impl From<DirectionArg> for CallDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Outgoing => CallDirection::Outgoing,
            DirectionArg::Incoming => CallDirection::Incoming,
            DirectionArg::Missed => CallDirection::Missed,
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct HistoryCliArgs {
    /// Filter by part of the peer number
    #[arg(short, long)]
    pub number: Option<String>,
    /// Filter by call direction
    #[arg(short, long, value_enum)]
    pub direction: Option<DirectionArg>,
    /// Maximum number of results to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
    /// Write the whole history as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,
    /// ID of a call whose recording should be exported
    #[arg(long, value_name = "ID")]
    pub export: Option<i64>,
    /// Directory for --export (defaults to the recordings directory)
    #[arg(long, value_name = "DIR", requires = "export")]
    pub out: Option<PathBuf>,
    /// ID of a call whose recording should be played
    #[arg(long, value_name = "ID")]
    pub play: Option<i64>,
    /// ID of a call whose number should be copied to the clipboard
    #[arg(short, long, value_name = "ID")]
    pub copy: Option<i64>,
}
