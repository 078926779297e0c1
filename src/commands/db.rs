use anyhow::{bail, Context, Result};
use log::info;
use structopt::StructOpt;
use txcov_lib::core::config::Overrides;
use txcov_lib::core::io::get_writer;

use super::common::{open_store, GlobalArgs, COMPRESSION_LEVEL};

/// Store maintenance.
#[derive(Debug, Clone, StructOpt)]
pub enum DbArgs {
    /// Create the tables.
    Setup {
        /// Drop every table first.
        #[structopt(long)]
        reset: bool,
    },
    /// List samples.
    Samples {
        /// Only samples of this group.
        #[structopt(long, short = "g")]
        group: Option<String>,
    },
    /// Delete a sample and all of its stats.
    Remove {
        sample: String,
    },
}

pub fn run_db(global: &GlobalArgs, args: DbArgs) -> Result<()> {
    let settings = global.settings(Overrides::default())?;
    let mut store = open_store(&settings)?;

    match args {
        DbArgs::Setup { reset } => {
            store.setup(reset).context("Failed to set up tables")?;
            info!("Store ready at {}", settings.database.display());
        }
        DbArgs::Samples { group } => {
            let samples = store.samples(group.as_deref())?;
            let mut writer = get_writer(&None::<&str>, false, false, 1, COMPRESSION_LEVEL)?;
            writer.write_record(["sample_id", "group_id", "source", "created_at"])?;
            for sample in samples {
                let created = sample.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
                writer.write_record([
                    sample.id.as_str(),
                    sample.group_id.as_deref().unwrap_or(""),
                    sample.source.as_deref().unwrap_or(""),
                    created.as_str(),
                ])?;
            }
            writer.flush()?;
        }
        DbArgs::Remove { sample } => {
            if !store.remove_sample(&sample)? {
                bail!("Sample {} not found in {}", sample, settings.database.display());
            }
            info!("Removed sample {}", sample);
        }
    }
    Ok(())
}
