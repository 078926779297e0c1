use anyhow::{Error, Result};
use log::{error, warn};

/// Build a dedicated Rayon pool with a validated number of workers.
pub fn build_worker_pool(size: usize) -> Result<rayon::ThreadPool> {
    let cpus = determine_allowed_cpus(size)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cpus)
        .thread_name(|idx| format!("txcov-worker-{}", idx))
        .build()?;
    Ok(pool)
}

/// Validate and normalize a requested worker count.
pub fn determine_allowed_cpus(desired: usize) -> Result<usize> {
    if desired == 0 {
        error!("Must select > 0 threads");
        Err(Error::msg("Too few threads selected. Min 1"))
    } else if desired > num_cpus::get() {
        warn!(
            "Specified more threads than are available ({}), using {}",
            num_cpus::get(),
            desired
        );
        Ok(desired)
    } else {
        Ok(desired)
    }
}
