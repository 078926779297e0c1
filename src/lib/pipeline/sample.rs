use log::{debug, info};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::diagnostics::DiagnosticSink;
use crate::core::error::CoverageError;
use crate::engine::aggregator::{aggregate, AggregationSettings, SampleAggregate};
use crate::engine::depth::DepthReader;
use crate::engine::index::IntervalIndex;
use crate::engine::sambamba::SambambaCommand;
use crate::model::Sample;
use crate::store::CoverageStore;

/// Where a sample's depth records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepthSource {
    /// Depth file on disk, `-` for stdin.
    File(PathBuf),
    /// Run the depth tool and read its stdout.
    Sambamba(SambambaCommand),
}

impl fmt::Display for DepthSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepthSource::File(path) => write!(f, "{}", path.display()),
            DepthSource::Sambamba(cmd) => write!(f, "{}", cmd.command_line()),
        }
    }
}

/// One unit of work: a sample and its depth source.
#[derive(Debug, Clone)]
pub struct SampleJob {
    pub sample: Sample,
    pub source: DepthSource,
}

impl SampleJob {
    pub fn new(sample: Sample, source: DepthSource) -> Self {
        Self { sample, source }
    }
}

/// Step of [`load_sample`] that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Aggregate,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Open => "open",
            Stage::Aggregate => "aggregate",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

/// A sample that could not be loaded. Nothing of it was written.
#[derive(Debug, Error)]
#[error("sample {sample_id} failed at {stage}: {source}")]
pub struct SampleError {
    pub sample_id: String,
    pub stage: Stage,
    #[source]
    pub source: CoverageError,
}

impl SampleError {
    fn new(sample_id: &str, stage: Stage, source: CoverageError) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            stage,
            source,
        }
    }
}

/// Result of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub sample_id: String,
    pub records: usize,
    pub stats: usize,
}

/// Reader, aggregator and writer for one sample.
///
/// Stats are committed in a single transaction together with the sample
/// row. Any failure leaves the store as it was.
pub fn load_sample(
    index: &IntervalIndex,
    job: &SampleJob,
    settings: &AggregationSettings,
    store: &mut CoverageStore,
    sink: &mut dyn DiagnosticSink,
) -> Result<LoadSummary, SampleError> {
    let sample_id = job.sample.id.as_str();
    info!("Loading sample {} from {}", sample_id, job.source);

    let SampleAggregate { records, stats } = match &job.source {
        DepthSource::File(path) => {
            let reader = DepthReader::from_path(path)
                .map_err(|e| SampleError::new(sample_id, Stage::Open, e))?;
            aggregate(index, settings, sample_id, reader, sink)
                .map_err(|e| SampleError::new(sample_id, Stage::Aggregate, e))?
        }
        DepthSource::Sambamba(cmd) => {
            let (reader, process) = cmd
                .spawn_stream()
                .map_err(|e| SampleError::new(sample_id, Stage::Open, e))?;
            match aggregate(index, settings, sample_id, reader, sink) {
                Ok(done) => {
                    process
                        .wait()
                        .map_err(|e| SampleError::new(sample_id, Stage::Aggregate, e))?;
                    done
                }
                Err(err) => {
                    process.abort();
                    return Err(SampleError::new(sample_id, Stage::Aggregate, err));
                }
            }
        }
    };
    debug!("Sample {}: {} stats from {} records", sample_id, stats.len(), records);

    let written = store
        .commit_sample(&job.sample, &stats)
        .map_err(|e| SampleError::new(sample_id, Stage::Write, e))?;

    Ok(LoadSummary {
        sample_id: sample_id.to_string(),
        records,
        stats: written,
    })
}
