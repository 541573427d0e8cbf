pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "guard")]
#[command(version, about = "Operator CLI for the LessPaper guard")]
pub struct Args {
    /// Path to the guard state directory (defaults to ~/.lesspaper)
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
