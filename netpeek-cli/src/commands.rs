use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "netpeek", version, about = "Live packet inspection")]
pub struct Cli {
    /// Configuration file; defaults to config/netpeek.yaml plus NETPEEK_* variables
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List capturable network interfaces
    Interfaces(InterfacesArgs),
    /// Capture and print decoded packets
    Capture(CaptureArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InterfacesArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Interface name, or `all`; defaults to capture.default_device
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Stop after this many packets
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// Stop after this many seconds
    #[arg(short, long)]
    pub seconds: Option<u64>,

    /// One JSON object per packet
    #[arg(long, conflicts_with = "hexdump")]
    pub json: bool,

    /// Print the layer breakdown and hex dump under each packet
    #[arg(long)]
    pub hexdump: bool,
}
