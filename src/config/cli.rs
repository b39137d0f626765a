use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "kindle-drop")]
#[command(about = "Convert EPUBs to AZW3 and serve e-books to a Kindle over Wi-Fi")]
pub struct CliArgs {
    /// Files to process right away
    pub files: Vec<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory whose contents are served to the Kindle
    #[arg(long)]
    pub serve_dir: Option<PathBuf>,

    /// First port to try; the next 99 are scanned before asking the OS
    #[arg(long)]
    pub port_start: Option<u16>,

    #[arg(long)]
    pub bind: Option<String>,

    /// Path to Calibre's ebook-convert
    #[arg(long)]
    pub converter: Option<PathBuf>,

    /// Per-file conversion timeout
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Extension of converted files, without the dot
    #[arg(long)]
    pub target_ext: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Print status as JSON instead of the startup banner
    #[arg(long)]
    pub status: bool,

    /// Do not print per-file progress lines
    #[arg(short, long)]
    pub quiet: bool,

    /// Process FILES and exit without serving
    #[arg(long)]
    pub once: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
