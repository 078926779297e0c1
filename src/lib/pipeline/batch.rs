use anyhow::Result;
use crossbeam::channel::{bounded, Receiver, Sender};
use log::{error, info, warn};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use super::sample::{load_sample, LoadSummary, SampleError, SampleJob, Stage};
use crate::core::concurrency::build_worker_pool;
use crate::core::diagnostics::DiagnosticReport;
use crate::engine::aggregator::AggregationSettings;
use crate::engine::index::IntervalIndex;
use crate::store::CoverageStore;

/// Completed samples buffered per worker before workers block.
const CHANNEL_SLOTS_PER_WORKER: usize = 4;

/// Outcome of one sample in a batch.
#[derive(Debug)]
pub struct SampleReport {
    pub sample_id: String,
    pub result: std::result::Result<LoadSummary, SampleError>,
    pub diagnostics: DiagnosticReport,
}

impl SampleReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Loads many samples in parallel against one shared index.
///
/// Every worker owns its own store connection; samples only share the
/// read-only [`IntervalIndex`]. Reports arrive in completion order.
pub struct BatchLoader {
    index: Arc<IntervalIndex>,
    settings: AggregationSettings,
    database: PathBuf,
    threads: usize,
}

impl BatchLoader {
    pub fn new(
        index: Arc<IntervalIndex>,
        settings: AggregationSettings,
        database: impl Into<PathBuf>,
        threads: usize,
    ) -> Self {
        Self {
            index,
            settings,
            database: database.into(),
            threads: threads.max(1),
        }
    }

    /// Start loading `jobs` in the background.
    pub fn process(self, jobs: Vec<SampleJob>) -> Result<Receiver<SampleReport>> {
        let pool = build_worker_pool(self.threads)?;
        let channel_size = self.threads.saturating_mul(CHANNEL_SLOTS_PER_WORKER).max(1);
        info!(
            "Loading {} samples on {} workers",
            jobs.len(),
            self.threads
        );

        let (sender, receiver) = bounded::<SampleReport>(channel_size);
        thread::spawn(move || {
            pool.install(move || self.run(jobs, sender));
        });
        Ok(receiver)
    }

    /// Load every job and wait for all reports.
    pub fn run_all(self, jobs: Vec<SampleJob>) -> Result<Vec<SampleReport>> {
        let receiver = self.process(jobs)?;
        Ok(receiver.iter().collect())
    }

    fn run(self, jobs: Vec<SampleJob>, sender: Sender<SampleReport>) {
        jobs.into_par_iter().for_each_init(
            || (sender.clone(), None::<CoverageStore>),
            |(snd, store), job| {
                let mut diagnostics = DiagnosticReport::new();
                let result = self.load_one(store, &job, &mut diagnostics);
                if let Err(err) = &result {
                    error!("{}", err);
                }
                let report = SampleReport {
                    sample_id: job.sample.id.clone(),
                    result,
                    diagnostics,
                };
                if snd.send(report).is_err() {
                    warn!("Report channel closed; dropping sample {}", job.sample.id);
                }
            },
        );
    }

    /// Load one job, opening this worker's store connection on first use.
    fn load_one(
        &self,
        slot: &mut Option<CoverageStore>,
        job: &SampleJob,
        diagnostics: &mut DiagnosticReport,
    ) -> std::result::Result<LoadSummary, SampleError> {
        let opened = match slot.take() {
            Some(store) => store,
            None => CoverageStore::open(&self.database).map_err(|source| SampleError {
                sample_id: job.sample.id.clone(),
                stage: Stage::Write,
                source,
            })?,
        };
        let store = slot.insert(opened);
        load_sample(&self.index, job, &self.settings, store, diagnostics)
    }
}
