use anyhow::{bail, Context, Result};
use log::info;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use structopt::StructOpt;
use txcov_lib::core::config::Overrides;
use txcov_lib::core::fs::{is_gzipped, make_parent_dirs};
use txcov_lib::core::io::get_writer;
use txcov_lib::model::TranscriptStat;

use super::common::{
    open_store, GlobalArgs, COMPRESSION_LEVEL_STR, MAX_COMPRESSION_LEVEL,
};

/// Write every stat of a sample as TSV.
#[derive(Debug, Clone, StructOpt)]
#[structopt(author, name = "export")]
pub struct ExportArgs {
    /// Sample id.
    pub sample: String,

    /// Output file, gzip-compressed when it ends in `.gz`. Defaults to stdout.
    #[structopt(long, short = "o")]
    pub output: Option<PathBuf>,

    /// gzip level (0-9) for `.gz` output.
    #[structopt(long, default_value = COMPRESSION_LEVEL_STR.as_str())]
    pub compression_level: u32,
}

pub fn run_export(global: &GlobalArgs, args: ExportArgs) -> Result<()> {
    if args.compression_level > MAX_COMPRESSION_LEVEL {
        bail!(
            "Compression level must be between 0 and {}, got {}",
            MAX_COMPRESSION_LEVEL,
            args.compression_level
        );
    }
    let settings = global.settings(Overrides::default())?;
    let store = open_store(&settings)?;
    if store.sample(&args.sample)?.is_none() {
        bail!("Sample {} not found in {}", args.sample, settings.database.display());
    }
    let stats = store.stats_for_sample(&args.sample)?;

    let gzipped = args.output.as_ref().map(is_gzipped).unwrap_or(false);
    if let Some(output) = &args.output {
        make_parent_dirs(output)?;
    }
    let mut writer = get_writer(
        &args.output,
        gzipped,
        false,
        settings.threads,
        args.compression_level,
    )
        .context("Failed to open export output")?;
    write_stats(&mut writer, &stats)?;
    info!("Exported {} stats for sample {}", stats.len(), args.sample);
    Ok(())
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub(crate) fn write_stats<W: Write>(
    writer: &mut csv::Writer<W>,
    stats: &[TranscriptStat],
) -> Result<()> {
    let thresholds: BTreeSet<u32> = stats.iter().flat_map(|s| s.thresholds()).collect();

    let mut header = vec![
        "sample_id".to_string(),
        "transcript_id".to_string(),
        "mean_coverage".to_string(),
    ];
    header.extend(thresholds.iter().map(|t| format!("completeness_{}", t)));
    header.push("threshold".to_string());
    header.push("incomplete_exons".to_string());
    writer.write_record(&header)?;

    for stat in stats {
        let mut row = vec![
            stat.sample_id.clone(),
            stat.transcript_id.clone(),
            format_value(stat.mean_coverage),
        ];
        row.extend(thresholds.iter().map(|t| format_value(stat.completeness(*t))));
        row.push(stat.threshold.to_string());
        row.push(stat.incomplete_exons.encode());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
