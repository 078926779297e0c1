use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;
use structopt::StructOpt;
use txcov_lib::core::config::Overrides;

use super::common::{build_index, open_store, GlobalArgs};

/// Load transcripts from an exon annotation file into the store.
#[derive(Debug, Clone, StructOpt)]
#[structopt(author, name = "link")]
pub struct LinkArgs {
    /// Exon BED file: chrom, start, end, exon id, transcript id, gene id.
    pub annotation: PathBuf,
}

pub fn run_link(global: &GlobalArgs, args: LinkArgs) -> Result<()> {
    let settings = global.settings(Overrides {
        annotation: Some(args.annotation),
        ..Overrides::default()
    })?;
    let (index, report) = build_index(&settings)?;

    let mut store = open_store(&settings)?;
    let written = store
        .upsert_transcripts(&index.transcripts())
        .context("Failed to store transcripts")?;
    info!(
        "Linked {} transcripts ({} malformed, {} exons without transcript)",
        written,
        report.malformed.len(),
        report.skipped_exons.len()
    );
    Ok(())
}
