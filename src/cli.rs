use clap::Parser;
use std::path::PathBuf;

/// A markdown editor that sinks into a field of note cards.
#[derive(Debug, Parser)]
#[command(name = "rainedit", version, about)]
pub struct Cli {
    /// Markdown file to edit. Defaults to the scratch file in the data directory.
    pub file: Option<PathBuf>,

    /// Freeze card drift and parallax so frames are deterministic.
    #[arg(long)]
    pub no_animations: bool,

    /// Read configuration from this file instead of the platform config path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
