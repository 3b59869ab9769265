//! Command-line interface definitions for elfscope.

use std::path::PathBuf;

use clap::Parser;

/// Inspect the headers, sections, and symbols of an ELF64 file.
#[expect(
    clippy::struct_excessive_bools,
    reason = "clap flags map one-to-one onto fields"
)]
#[derive(Parser)]
#[command(name = "elfscope", version, about)]
pub struct Cli {
    /// ELF64 file to inspect.
    pub file: Option<PathBuf>,

    /// TOML config file (defaults to ./elfscope.toml when present).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Emit a single JSON document instead of text.
    #[arg(long)]
    pub json: bool,

    /// Demangle Rust symbol names.
    #[arg(long)]
    pub demangle: bool,

    /// Leave the file header out of the report.
    #[arg(long)]
    pub no_header: bool,

    /// Leave program headers out of the report.
    #[arg(long)]
    pub no_segments: bool,

    /// Leave section headers out of the report.
    #[arg(long)]
    pub no_sections: bool,

    /// Leave the symbol table out of the report.
    #[arg(long)]
    pub no_symbols: bool,

    /// Suppress warnings; print only the report and errors.
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print stage timings and diagnostics.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
