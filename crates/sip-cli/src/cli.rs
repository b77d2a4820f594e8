use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sip",
    about = "Assemble, inspect and verify Submission Information Packages",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Archive every file under a directory into one or more SIPs
    Assemble(AssembleArgs),
    /// List the entries of a SIP
    Inspect(InspectArgs),
    /// Check container integrity and every content hash in the PDI
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct AssembleArgs {
    /// Directory to archive
    pub source: PathBuf,
    /// Directory receiving the SIPs
    #[arg(short, long)]
    pub out: PathBuf,
    /// TOML assembly configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub application: Option<String>,
    #[arg(long)]
    pub holding: Option<String>,
    #[arg(long)]
    pub producer: Option<String>,
    #[arg(long)]
    pub schema: Option<String>,
    #[arg(long)]
    pub dss_prefix: Option<String>,

    #[arg(long)]
    pub max_aius: Option<u64>,
    #[arg(long)]
    pub max_digital_objects: Option<u64>,
    #[arg(long)]
    pub max_pdi_size: Option<u64>,
    #[arg(long)]
    pub max_digital_objects_size: Option<u64>,
    #[arg(long)]
    pub max_sip_size: Option<u64>,

    /// Content hash as FUNCTION:ENCODING, e.g. sha-256:base64 (repeatable)
    #[arg(long = "hash")]
    pub hashes: Vec<String>,
    /// Store entries without zstd compression
    #[arg(long)]
    pub no_compression: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
