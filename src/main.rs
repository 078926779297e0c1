//! txcov - transcript coverage statistics
//!
//! txcov turns per-region sequencing depth into per-transcript coverage
//! statistics (mean coverage, completeness at several depth thresholds and
//! the exons falling short) and keeps them in a SQLite store for reporting.
//!
//! # Tools
//!
//! - `db`: create, list or prune the store
//! - `link`: load transcripts from an exon annotation
//! - `sambamba`: run `sambamba depth region` over a BAM
//! - `load`: aggregate one sample's depth output into stats
//! - `batch`: load many samples in parallel from a manifest
//! - `calculate`: summarize stored stats per sample or gene
//! - `export`: dump a sample's stats as TSV
//!
//! # Usage
//!
//! ```bash
//! txcov db setup
//! txcov link exons.bed
//! txcov sambamba sample.bam --regions exons.bed -o sample.depth.bed
//! txcov load sample.depth.bed --sample S1 --group fam1 --annotation exons.bed
//! txcov calculate mean
//! txcov -vv --log txcov.log batch samples.tsv --annotation exons.bed
//! ```

extern crate txcov_lib;
pub mod commands;
use anyhow::Result;
use env_logger::{Env, Target};
use log::*;
use structopt::StructOpt;
use txcov_lib::core::errors::is_broken_pipe;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case", author, about)]
/// Transcript coverage statistics for clinical sequencing
struct Args {
    #[structopt(flatten)]
    global: commands::GlobalArgs,

    #[structopt(subcommand)]
    subcommand: Subcommand,
}

#[derive(StructOpt)]
enum Subcommand {
    /// Manage the store
    Db(commands::DbArgs),
    /// Load transcripts from an exon annotation
    Link(commands::LinkArgs),
    /// Run sambamba depth region
    Sambamba(commands::SambambaArgs),
    /// Load one sample's depth output
    Load(commands::LoadArgs),
    /// Load samples listed in a manifest in parallel
    Batch(commands::BatchArgs),
    /// Summarize stored stats
    Calculate(commands::CalculateArgs),
    /// Export a sample's stats
    Export(commands::ExportArgs),
}

impl Subcommand {
    fn run(self, global: &commands::GlobalArgs) -> Result<()> {
        match self {
            Subcommand::Db(args) => commands::run_db(global, args)?,
            Subcommand::Link(args) => commands::run_link(global, args)?,
            Subcommand::Sambamba(args) => commands::run_sambamba(global, args)?,
            Subcommand::Load(args) => commands::run_load(global, args)?,
            Subcommand::Batch(args) => commands::run_batch(global, args)?,
            Subcommand::Calculate(args) => commands::run_calculate(global, args)?,
            Subcommand::Export(args) => commands::run_export(global, args)?,
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::from_args();
    let mut logger =
        env_logger::Builder::from_env(Env::default().default_filter_or(args.global.log_level()));
    if let Some(file) = args.global.log_target()? {
        logger.target(Target::Pipe(file));
    }
    logger.init();
    if let Err(err) = args.subcommand.run(&args.global) {
        if is_broken_pipe(&err) {
            std::process::exit(0);
        }
        error!("{:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
