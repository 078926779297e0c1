use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use structopt::StructOpt;
use txcov_lib::core::config::Overrides;
use txcov_lib::core::io::open_lines;
use txcov_lib::engine::AggregationSettings;
use txcov_lib::model::{Sample, Thresholds};
use txcov_lib::pipeline::{BatchLoader, DepthSource, SampleJob};

use super::common::{build_index, GlobalArgs};

/// Load many samples in parallel from a manifest.
#[derive(Debug, Clone, StructOpt)]
#[structopt(author, name = "batch")]
pub struct BatchArgs {
    /// Tab-separated manifest: sample id, group id (may be empty), depth
    /// file. Lines starting with `#` are ignored.
    pub manifest: PathBuf,

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

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ManifestRow {
    sample_id: String,
    group_id: Option<String>,
    depth: PathBuf,
}

/// Parse a manifest into jobs. Relative depth paths are taken relative to
/// the manifest.
fn read_manifest(path: &Path) -> Result<Vec<SampleJob>> {
    let lines = open_lines(path)
        .with_context(|| format!("Failed to open manifest {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(lines);

    let mut jobs = Vec::new();
    for (i, row) in reader.deserialize::<ManifestRow>().enumerate() {
        let row = row.with_context(|| format!("{}: bad manifest row {}", path.display(), i + 1))?;
        let depth = if row.depth.is_relative() && row.depth != Path::new("-") {
            base.join(&row.depth)
        } else {
            row.depth
        };
        let sample = Sample::new(row.sample_id)
            .with_group(row.group_id.filter(|g| !g.is_empty()))
            .with_source(Some(depth.display().to_string()));
        jobs.push(SampleJob::new(sample, DepthSource::File(depth)));
    }
    Ok(jobs)
}

pub fn run_batch(global: &GlobalArgs, args: BatchArgs) -> Result<()> {
    let settings = global.settings(Overrides {
        annotation: args.annotation,
        thresholds: args.thresholds,
        threshold: args.threshold,
        ..Overrides::default()
    })?;
    let jobs = read_manifest(&args.manifest)?;
    if jobs.is_empty() {
        warn!("Manifest {} lists no samples", args.manifest.display());
        return Ok(());
    }
    let total = jobs.len();

    let (index, _) = build_index(&settings)?;
    let loader = BatchLoader::new(
        Arc::new(index),
        AggregationSettings::from(&settings),
        settings.database.clone(),
        settings.threads,
    );

    let mut failed = 0usize;
    for report in loader.process(jobs)?.iter() {
        match &report.result {
            Ok(summary) => info!(
                "Sample {}: {} stats ({})",
                summary.sample_id,
                summary.stats,
                report.diagnostics.summary()
            ),
            Err(err) => {
                failed += 1;
                error!("{}", err);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} samples failed", failed, total);
    }
    info!("Loaded {} samples", total);
    Ok(())
}
