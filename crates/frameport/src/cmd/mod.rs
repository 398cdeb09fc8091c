use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode an event into its wire form.
    Encode(EncodeArgs),
    /// Decode a wire string and print the event it carries.
    Decode(DecodeArgs),
    /// Run a host document and a late-loading frame in memory.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Event type.
    #[arg(long = "type", value_name = "TYPE")]
    pub event_type: String,
    /// Event argument as JSON (repeatable, in order).
    #[arg(long = "arg", value_name = "JSON")]
    pub args: Vec<String>,
    /// Correlation id to place on the envelope.
    #[arg(long, value_name = "ID")]
    pub ref_id: Option<String>,
    /// Container nesting limit.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,
    /// Pretty-print with this indent width.
    #[arg(long, value_name = "N")]
    pub space: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire string as produced by `encode`.
    pub wire: String,
    /// Drop function bodies when reviving function markers.
    #[arg(long)]
    pub strip_function_bodies: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of events the frame sends before it is attached.
    #[arg(long, default_value = "3")]
    pub events: usize,
    /// Address of the host document.
    #[arg(long, value_name = "URL", default_value = "http://localhost:6006/")]
    pub host_url: String,
    /// Correlation id placed on the frame's address.
    #[arg(long, value_name = "ID")]
    pub ref_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
