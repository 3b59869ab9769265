//! Diagnostics on stderr.
//!
//! stdout belongs to the report. Warnings about the input and per-stage
//! traces go to stderr, filtered by the level chosen with `-q`/`-v`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// How much goes to stderr besides errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Errors only (`-q`).
    Quiet = 0,
    /// Warnings about the input.
    Warn = 1,
    /// Warnings, config resolution and stage traces (`-v`).
    Trace = 2,
}

impl Level {
    /// Pick the level for the `-q`/`-v` flags. clap rejects both at once.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, true) => Self::Trace,
            (false, false) => Self::Warn,
        }
    }
}

static LEVEL: AtomicU8 = AtomicU8::new(Level::Warn as u8);

/// Set the process-wide level.
pub fn set_level(level: Level) {
    LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Whether messages at `level` are printed.
pub fn enabled(level: Level) -> bool {
    LEVEL.load(Ordering::Relaxed) >= level as u8
}

/// Trace line, printed with `-v` only.
macro_rules! trace {
    ($($arg:tt)*) => {
        if $crate::diag::enabled($crate::diag::Level::Trace) {
            eprintln!("  {}", format_args!($($arg)*));
        }
    };
}

pub(crate) use trace;

/// Warning about the input, silenced by `-q`.
macro_rules! warning {
    ($($arg:tt)*) => {
        if $crate::diag::enabled($crate::diag::Level::Warn) {
            eprintln!("warning: {}", format_args!($($arg)*));
        }
    };
}

pub(crate) use warning;

/// Times one parser stage and traces what it produced when dropped.
///
/// ```ignore
/// let mut t = StageTimer::stage("section table");
/// parser.read_section_table()?;
/// t.produced(parser.sections().all().count(), "sections");
/// // traces "  section table: 12 sections in 3.1µs"
/// ```
pub struct StageTimer {
    stage: &'static str,
    start: Instant,
    produced: Option<(usize, &'static str)>,
}

impl StageTimer {
    /// Start timing `stage`.
    pub fn stage(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
            produced: None,
        }
    }

    /// Record how many `unit`s the stage yielded.
    pub fn produced(&mut self, count: usize, unit: &'static str) {
        self.produced = Some((count, unit));
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        if enabled(Level::Trace) {
            eprintln!("  {}", stage_line(self.stage, self.produced, self.start.elapsed()));
        }
    }
}

/// A stage that failed part-way has no count and reports only its time.
fn stage_line(stage: &str, produced: Option<(usize, &str)>, elapsed: Duration) -> String {
    match produced {
        Some((count, unit)) => format!("{stage}: {count} {unit} in {elapsed:.1?}"),
        None => format!("{stage}: {elapsed:.1?}"),
    }
}
