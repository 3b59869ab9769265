//! elfscope: inspect the structure of ELF64 files.
//!
//! Loads a file, runs the staged decoder from `elfscope-elf`, and reports
//! the file header, program headers, section headers, and symbol table as
//! text or JSON.

mod cli;
mod config;
mod diag;
mod report;

use std::cell::RefCell;
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use elfscope_elf::{ElfError, ElfParser};

use config::{Format, Settings};
use report::{HeaderRecord, Report, SectionRecord, SegmentRecord, SymbolRecord};
use diag::{Level, StageTimer, trace, warning};

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();
    diag::set_level(Level::from_flags(cli.quiet, cli.verbose));

    let Some(file) = cli.file.as_deref() else {
        eprintln!("{}", cli::Cli::command().render_usage());
        return Ok(ExitCode::from(1));
    };

    let settings = Settings::resolve(&cli)?;
    let report = collect(file, settings)?;

    match settings.format {
        Format::Text => print!("{}", report.to_text()),
        Format::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        ),
    }
    Ok(ExitCode::SUCCESS)
}

/// Load and parse `path`, gathering the enabled regions into a [`Report`].
fn collect(path: &Path, settings: Settings) -> Result<Report> {
    let mut parser = ElfParser::open(path);
    {
        let mut t = StageTimer::stage("load");
        parser.load()?;
        t.produced(parser.data().len(), "bytes");
    }

    let report = Rc::new(RefCell::new(Report {
        file: path.display().to_string(),
        ..Report::default()
    }));
    install_handlers(&mut parser, &report, settings);

    {
        let _t = StageTimer::stage("header");
        parser.read_header().context("failed to read ELF header")?;
    }
    {
        let mut t = StageTimer::stage("program headers");
        parser
            .read_program_headers()
            .context("failed to read program headers")?;
        t.produced(parser.program_headers().len(), "entries");
    }
    {
        let mut t = StageTimer::stage("section table");
        parser
            .read_section_table()
            .context("failed to read section table")?;
        t.produced(parser.sections().all().count(), "sections");
    }
    if !parser.status().section_table_read() {
        trace!("no section header table");
    }
    if settings.regions.symbols {
        let mut t = StageTimer::stage("symbol table");
        match parser.read_symbol_table() {
            Err(ElfError::MissingSection(name)) => {
                warning!("{}: no symbol table ({name} missing)", path.display());
                report
                    .borrow_mut()
                    .warnings
                    .push(format!("no symbol table ({name} missing)"));
            }
            other => other.context("failed to read symbol table")?,
        }
        t.produced(parser.symbols().all().count(), "symbols");
    }
    trace!("status: {:?}", parser.status());

    // Dropping the parser releases the handlers' clones of `report`.
    drop(parser);
    Rc::try_unwrap(report)
        .map(RefCell::into_inner)
        .map_err(|_| anyhow::anyhow!("report still shared after parsing"))
}

/// Register a handler for each region the settings ask for.
fn install_handlers(parser: &mut ElfParser, report: &Rc<RefCell<Report>>, settings: Settings) {
    let regions = settings.regions;
    if regions.header {
        let report = Rc::clone(report);
        parser.set_header_handler(move |h| {
            report.borrow_mut().header = Some(HeaderRecord::from(h));
        });
    }
    if regions.segments {
        let report = Rc::clone(report);
        parser.set_program_header_handler(move |p| {
            report.borrow_mut().segments.push(SegmentRecord::from(p));
        });
    }
    if regions.sections {
        let report = Rc::clone(report);
        parser.set_section_handler(move |s, name| {
            report.borrow_mut().sections.push(SectionRecord::new(s, name));
        });
    }
    if regions.symbols {
        let report = Rc::clone(report);
        let demangle = settings.demangle;
        parser.set_symbol_handler(move |sym, name| {
            report
                .borrow_mut()
                .symbols
                .push(SymbolRecord::new(sym, name, demangle));
        });
    }
}
