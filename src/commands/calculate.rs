use anyhow::Result;
use std::collections::BTreeSet;
use std::io::Write;
use structopt::StructOpt;
use txcov_lib::core::config::Overrides;
use txcov_lib::core::io::get_writer;
use txcov_lib::store::SampleSummary;

use super::common::{open_store, GlobalArgs, COMPRESSION_LEVEL};

/// Summary statistics over stored stats.
#[derive(Debug, Clone, StructOpt)]
pub enum CalculateArgs {
    /// Average mean coverage and completeness per sample.
    Mean {
        /// Restrict to these samples; repeatable.
        #[structopt(long, short = "s")]
        sample: Vec<String>,
    },
    /// Per-sample averages over the transcripts of one gene.
    Gene { gene_id: String },
}

pub fn run_calculate(global: &GlobalArgs, args: CalculateArgs) -> Result<()> {
    let settings = global.settings(Overrides::default())?;
    let store = open_store(&settings)?;
    let summaries = match args {
        CalculateArgs::Mean { sample } => store.mean_summary(&sample)?,
        CalculateArgs::Gene { gene_id } => store.gene_summary(&gene_id)?,
    };
    let mut writer = get_writer(&None::<&str>, false, false, 1, COMPRESSION_LEVEL)?;
    write_summaries(&mut writer, &summaries)?;
    Ok(())
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_default()
}

/// TSV with one column per threshold present in any summary.
pub(crate) fn write_summaries<W: Write>(
    writer: &mut csv::Writer<W>,
    summaries: &[SampleSummary],
) -> Result<()> {
    let thresholds: BTreeSet<u32> = summaries
        .iter()
        .flat_map(|s| s.completeness.keys().copied())
        .collect();

    let mut header = vec!["sample_id".to_string(), "mean_coverage".to_string()];
    header.extend(thresholds.iter().map(|t| format!("completeness_{}", t)));
    writer.write_record(&header)?;

    for summary in summaries {
        let mut row = vec![summary.sample_id.clone(), format_value(summary.mean_coverage)];
        row.extend(
            thresholds
                .iter()
                .map(|t| format_value(summary.completeness.get(t).copied().flatten())),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
