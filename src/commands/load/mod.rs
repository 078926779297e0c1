mod args;

use anyhow::{Context, Result};
use log::{info, warn};
use txcov_lib::core::diagnostics::DiagnosticReport;
use txcov_lib::engine::{AggregationSettings, SambambaCommand};
use txcov_lib::pipeline::{load_sample, DepthSource, SampleJob};

use super::common::{build_index, open_store, GlobalArgs};

pub use args::{LoadArgs, LoadConfig, LoadInput};

/// Execute the `load` command for a single sample.
pub fn run_load(global: &GlobalArgs, args: LoadArgs) -> Result<()> {
    let config = LoadConfig::from_args(args)?;
    let settings = global.settings(config.overrides.clone())?;
    let (index, _) = build_index(&settings)?;
    let aggregation = AggregationSettings::from(&settings);

    let source = match config.input {
        LoadInput::File(path) => DepthSource::File(path),
        LoadInput::Bam { alignment, regions } => {
            let regions = match regions {
                Some(regions) => regions,
                None => settings.require_annotation()?.to_path_buf(),
            };
            DepthSource::Sambamba(
                SambambaCommand::new(regions, alignment)
                    .executable(settings.sambamba.clone())
                    .thresholds(settings.thresholds.iter().filter(|t| *t > 0)),
            )
        }
    };

    let mut store = open_store(&settings)?;
    let job = SampleJob::new(config.sample, source);
    let mut report = DiagnosticReport::new();
    let summary = load_sample(&index, &job, &aggregation, &mut store, &mut report)
        .with_context(|| format!("Failed to load sample {}", job.sample.id))?;

    if report.unknown_regions > 0 {
        warn!(
            "Sample {}: {} records for unknown regions skipped",
            summary.sample_id, report.unknown_regions
        );
    }
    if summary.stats == 0 {
        warn!(
            "Sample {}: no depth record matched the annotation",
            summary.sample_id
        );
    }
    info!(
        "Loaded sample {}: {} stats from {} records",
        summary.sample_id, summary.stats, summary.records
    );
    Ok(())
}
