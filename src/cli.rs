//! Command line interface for the stampede demo binary.
//!
//! Provides a tiny CLI to run scenario files against the in-process
//! loopback broker; man page generation reuses the same definition.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the `stampede` binary.
#[derive(Debug, Parser)]
#[command(
    name = "stampede",
    version,
    about = "Run a scenario file against an in-process loopback broker"
)]
pub struct Cli {
    /// Path to a scenario JSON file.
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// Number of virtual-user iterations to run.
    #[arg(short, long, default_value_t = 1)]
    pub iterations: u32,
}
