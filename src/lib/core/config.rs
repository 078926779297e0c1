//! Layered run configuration.
//!
//! Values come from three places, highest precedence first: command-line
//! overrides, an optional YAML file, built-in defaults.
//!
//! ```yaml
//! database: coverage.sqlite3
//! annotation: exons.bed
//! thresholds: [10, 15, 20, 50, 100]
//! threshold: 10
//! threads: 4
//! sambamba: /opt/bin/sambamba
//! ```

use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{CoverageError, Result};
use crate::model::{Thresholds, DEFAULT_PRIMARY_THRESHOLD};

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE_NAME: &str = "txcov.yaml";

/// Store path used when neither the CLI nor the config file names one.
pub const DEFAULT_DATABASE: &str = "coverage.sqlite3";

/// Depth tool executable looked up on `PATH` by default.
pub const DEFAULT_SAMBAMBA: &str = "sambamba";

/// Contents of a YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database: Option<PathBuf>,
    pub annotation: Option<PathBuf>,
    pub thresholds: Option<Vec<u32>>,
    pub threshold: Option<u32>,
    pub threads: Option<usize>,
    pub sambamba: Option<PathBuf>,
}

impl FileConfig {
    /// Parse a config file. A missing file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            CoverageError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse a config file if present, falling back to an empty config.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            debug!("Reading config from {}", path.display());
            Self::load(path)
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub annotation: Option<PathBuf>,
    pub thresholds: Option<Thresholds>,
    pub threshold: Option<u32>,
    pub threads: Option<usize>,
    pub sambamba: Option<PathBuf>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database: PathBuf,
    /// Exon annotation used to build the interval index.
    pub annotation: Option<PathBuf>,
    pub thresholds: Thresholds,
    pub primary_threshold: u32,
    pub threads: usize,
    pub sambamba: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            annotation: None,
            thresholds: Thresholds::default(),
            primary_threshold: DEFAULT_PRIMARY_THRESHOLD,
            threads: 1,
            sambamba: PathBuf::from(DEFAULT_SAMBAMBA),
        }
    }
}

impl Settings {
    /// Merge file values and CLI overrides over the defaults, then validate.
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self> {
        let defaults = Settings::default();

        let thresholds = match (cli.thresholds, file.thresholds) {
            (Some(t), _) => t,
            (None, Some(values)) => Thresholds::new(values)?,
            (None, None) => defaults.thresholds,
        };

        let settings = Settings {
            database: cli.database.or(file.database).unwrap_or(defaults.database),
            annotation: cli.annotation.or(file.annotation),
            thresholds,
            primary_threshold: cli
                .threshold
                .or(file.threshold)
                .unwrap_or(defaults.primary_threshold),
            threads: cli.threads.or(file.threads).unwrap_or(defaults.threads),
            sambamba: cli.sambamba.or(file.sambamba).unwrap_or(defaults.sambamba),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints.
    ///
    /// The primary threshold must be one of the configured thresholds so
    /// that region-summary depth files carry a value for it.
    pub fn validate(&self) -> Result<()> {
        if !self.thresholds.contains(self.primary_threshold) {
            return Err(CoverageError::Config(format!(
                "primary threshold {} is not among configured thresholds {}",
                self.primary_threshold, self.thresholds
            )));
        }
        if self.threads == 0 {
            return Err(CoverageError::InvalidInput(
                "threads must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Annotation path, required by commands that build the interval index.
    pub fn require_annotation(&self) -> Result<&Path> {
        self.annotation.as_deref().ok_or_else(|| {
            CoverageError::Config(
                "no exon annotation given (use --annotation or the `annotation` config key)"
                    .to_string(),
            )
        })
    }
}
