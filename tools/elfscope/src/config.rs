//! Report settings: built-in defaults, then `elfscope.toml`, then flags.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Cli;
use crate::diag::trace;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG: &str = "elfscope.toml";

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Contents of `elfscope.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    format: Option<Format>,
    demangle: Option<bool>,
    report: RegionConfig,
}

/// The `[report]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RegionConfig {
    header: Option<bool>,
    segments: Option<bool>,
    sections: Option<bool>,
    symbols: Option<bool>,
}

/// Which regions end up in the report.
#[expect(
    clippy::struct_excessive_bools,
    reason = "one independent switch per report region"
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub header: bool,
    pub segments: bool,
    pub sections: bool,
    pub symbols: bool,
}

impl Default for Regions {
    fn default() -> Self {
        Self {
            header: true,
            segments: true,
            sections: true,
            symbols: true,
        }
    }
}

/// Fully resolved report settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub format: Format,
    pub demangle: bool,
    pub regions: Regions,
}

impl Settings {
    /// Resolve settings for this invocation.
    ///
    /// An explicit `--config` must exist and parse. The implicit
    /// `./elfscope.toml` is only read when it exists.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = if let Some(path) = &cli.config {
            Some(load_file(path)?)
        } else {
            let implicit = Path::new(DEFAULT_CONFIG);
            if implicit.is_file() {
                Some(load_file(implicit)?)
            } else {
                None
            }
        };

        let mut settings = Self::default();
        if let Some(file) = file {
            settings.apply_file(&file);
        }
        settings.apply_cli(cli);
        trace!("settings: {settings:?}");
        Ok(settings)
    }

    fn apply_file(&mut self, file: &FileConfig) {
        if let Some(format) = file.format {
            self.format = format;
        }
        if let Some(demangle) = file.demangle {
            self.demangle = demangle;
        }
        let r = &file.report;
        let regions = &mut self.regions;
        for (slot, value) in [
            (&mut regions.header, r.header),
            (&mut regions.segments, r.segments),
            (&mut regions.sections, r.sections),
            (&mut regions.symbols, r.symbols),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if cli.json {
            self.format = Format::Json;
        }
        self.demangle |= cli.demangle;
        self.regions.header &= !cli.no_header;
        self.regions.segments &= !cli.no_segments;
        self.regions.sections &= !cli.no_sections;
        self.regions.symbols &= !cli.no_symbols;
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    trace!("loaded config from {}", path.display());
    Ok(config)
}
