use anyhow::{Context, Result};
use std::path::PathBuf;
use structopt::StructOpt;
use txcov_lib::core::config::Overrides;
use txcov_lib::engine::SambambaCommand;

use super::common::GlobalArgs;

/// Run `sambamba depth region` over an alignment.
#[derive(Debug, Clone, StructOpt)]
#[structopt(author, name = "sambamba")]
pub struct SambambaArgs {
    /// Indexed BAM file.
    pub alignment: PathBuf,

    /// Region BED file (exon id in the fourth column).
    #[structopt(long, short = "r")]
    pub regions: PathBuf,

    /// Write the region summary here instead of stdout.
    #[structopt(long, short = "o")]
    pub output: Option<PathBuf>,

    /// Depth threshold to report; repeatable. Defaults to the configured set.
    #[structopt(long = "cov-threshold", short = "T")]
    pub thresholds: Vec<u32>,
}

pub fn run_sambamba(global: &GlobalArgs, args: SambambaArgs) -> Result<()> {
    let settings = global.settings(Overrides::default())?;
    let thresholds: Vec<u32> = if args.thresholds.is_empty() {
        settings.thresholds.iter().filter(|t| *t > 0).collect()
    } else {
        args.thresholds
    };

    let mut cmd = SambambaCommand::new(args.regions, args.alignment)
        .executable(settings.sambamba.clone())
        .thresholds(thresholds);
    if let Some(output) = args.output {
        cmd = cmd.output(output);
    }
    cmd.run()
        .with_context(|| format!("Failed to run {}", cmd.command_line()))
}
