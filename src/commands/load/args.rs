use std::path::PathBuf;
use structopt::StructOpt;
use txcov_lib::core::config::Overrides;
use txcov_lib::core::error::{CoverageError, Result};
use txcov_lib::model::{Sample, Thresholds};

/// CLI arguments for the `load` subcommand.
#[derive(Debug, Clone, StructOpt)]
#[structopt(author, name = "load")]
pub struct LoadArgs {
    /// Depth file (region summary or per-base runs, optionally gzipped; `-`
    /// for stdin). Omit when streaming from `--bam`.
    pub depth: Option<PathBuf>,

    /// Run sambamba on this BAM and aggregate its output directly.
    #[structopt(long, conflicts_with = "depth")]
    pub bam: Option<PathBuf>,

    /// Region BED handed to sambamba. Defaults to the annotation.
    #[structopt(long, short = "r", requires = "bam")]
    pub regions: Option<PathBuf>,

    /// Sample id.
    #[structopt(long, short = "s")]
    pub sample: String,

    /// Group (family, cohort) the sample belongs to.
    #[structopt(long, short = "g")]
    pub group: Option<String>,

    /// Origin of the depth data recorded with the sample. Defaults to the
    /// depth file or BAM path.
    #[structopt(long)]
    pub source: Option<String>,

    /// Exon annotation used to build the interval index.
    #[structopt(long, short = "a")]
    pub annotation: Option<PathBuf>,

    /// Comma-separated completeness thresholds.
    #[structopt(long)]
    pub thresholds: Option<Thresholds>,

    /// Primary threshold deciding which exons are incomplete.
    #[structopt(long, short = "T")]
    pub threshold: Option<u32>,
}

/// Where `load` reads depth from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadInput {
    File(PathBuf),
    Bam {
        alignment: PathBuf,
        regions: Option<PathBuf>,
    },
}

/// Normalised configuration derived from [`LoadArgs`].
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub input: LoadInput,
    pub sample: Sample,
    pub overrides: Overrides,
}

impl LoadConfig {
    pub fn from_args(args: LoadArgs) -> Result<Self> {
        let input = match (args.depth, args.bam) {
            (Some(depth), None) => LoadInput::File(depth),
            (None, Some(alignment)) => LoadInput::Bam {
                alignment,
                regions: args.regions,
            },
            (None, None) => {
                return Err(CoverageError::InvalidInput(
                    "give a depth file or --bam".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(CoverageError::InvalidInput(
                    "a depth file and --bam are mutually exclusive".to_string(),
                ))
            }
        };

        let default_source = match &input {
            LoadInput::File(path) => path.display().to_string(),
            LoadInput::Bam { alignment, .. } => alignment.display().to_string(),
        };
        let sample = Sample::new(args.sample)
            .with_group(args.group)
            .with_source(Some(args.source.unwrap_or(default_source)));

        Ok(LoadConfig {
            input,
            sample,
            overrides: Overrides {
                annotation: args.annotation,
                thresholds: args.thresholds,
                threshold: args.threshold,
                ..Overrides::default()
            },
        })
    }
}
