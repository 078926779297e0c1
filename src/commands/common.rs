use anyhow::{Context, Result};
use lazy_static::lazy_static;
use log::{info, warn};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use structopt::StructOpt;
use txcov_lib::core::config::{FileConfig, Overrides, Settings, CONFIG_FILE_NAME};
use txcov_lib::core::diagnostics::DiagnosticReport;
use txcov_lib::core::fs::make_parent_dirs;
use txcov_lib::engine::IntervalIndex;
use txcov_lib::store::CoverageStore;

/// gzip level for compressed TSV output.
pub const COMPRESSION_LEVEL: u32 = 6;

/// Highest level gzip accepts.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

lazy_static! {
    /// COMPRESSION_LEVEL as a str
    pub static ref COMPRESSION_LEVEL_STR: String = COMPRESSION_LEVEL.to_string();
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, StructOpt)]
pub struct GlobalArgs {
    /// YAML config file. Ignored when the default file does not exist.
    #[structopt(long, short = "c", global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// SQLite database holding transcripts, samples and stats.
    #[structopt(long, short = "d", global = true)]
    pub database: Option<PathBuf>,

    /// Worker threads for batch loading.
    #[structopt(long, short = "t", global = true)]
    pub threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug).
    #[structopt(short = "v", global = true, parse(from_occurrences))]
    pub verbose: u8,

    /// Append log lines to this file instead of stderr.
    #[structopt(long = "log", short = "l", global = true)]
    pub log_file: Option<PathBuf>,
}

impl GlobalArgs {
    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Open the log file for appending, `None` when logging to stderr.
    pub fn log_target(&self) -> Result<Option<Box<dyn Write + Send>>> {
        let path = match &self.log_file {
            Some(path) => path,
            None => return Ok(None),
        };
        make_parent_dirs(path)
            .with_context(|| format!("Failed to create directory for {}", path.display()))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(Some(Box::new(file)))
    }

    /// Merge config file, these options and command-specific `overrides`.
    pub fn settings(&self, overrides: Overrides) -> Result<Settings> {
        let file = if self.config == PathBuf::from(CONFIG_FILE_NAME) {
            FileConfig::load_optional(&self.config)
        } else {
            FileConfig::load(&self.config)
        }
        .with_context(|| format!("Failed to read config {}", self.config.display()))?;

        let overrides = Overrides {
            database: self.database.clone().or(overrides.database),
            threads: self.threads.or(overrides.threads),
            ..overrides
        };
        Ok(Settings::resolve(file, overrides)?)
    }
}

/// Open the store named by `settings`.
pub fn open_store(settings: &Settings) -> Result<CoverageStore> {
    CoverageStore::open(&settings.database)
        .with_context(|| format!("Failed to open store {}", settings.database.display()))
}

/// Build the interval index from the configured annotation.
pub fn build_index(settings: &Settings) -> Result<(IntervalIndex, DiagnosticReport)> {
    let annotation = settings.require_annotation()?;
    let mut report = DiagnosticReport::new();
    let index = IntervalIndex::from_path(annotation, &mut report)
        .with_context(|| format!("Failed to index annotation {}", annotation.display()))?;
    if !report.is_empty() {
        warn!("Annotation {}: {}", annotation.display(), report.summary());
    }
    info!(
        "Index holds {} transcripts and {} regions",
        index.len(),
        index.region_count()
    );
    Ok((index, report))
}
