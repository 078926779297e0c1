//! txcov: transcript coverage statistics for clinical sequencing
//!
//! txcov rolls per-region depth output of an alignment depth tool up into
//! per-transcript statistics and keeps them in a SQLite store:
//! 1. Exon annotation is indexed into transcripts with merged, non-overlapping
//!    exon intervals
//! 2. Depth records for a sample are aggregated in a single streaming pass into
//!    mean coverage, completeness at every configured threshold, and the exons
//!    failing the primary threshold
//! 3. The stats of a sample are written in one transaction, replacing any
//!    earlier load of the same sample
//!
//! # Modules
//!
//! - [`annotation`]: exon annotation parsing
//! - [`engine`]: interval index, depth readers, aggregator and the depth tool
//! - [`model`]: transcripts, samples and stats
//! - [`store`]: persistence and queries
//! - [`pipeline`]: per-sample and batch loading
//! - [`core`]: errors, configuration, diagnostics and I/O helpers

pub mod annotation;
pub mod core;
pub mod engine;
pub mod model;
pub mod pipeline;
pub mod store;

pub mod prelude {
    pub use crate::annotation::{read_exons, AnnotatedExon};
    pub use crate::core::prelude::*;
    pub use crate::engine::{
        aggregate, AggregationSettings, CoverageAggregator, DepthReader, DepthRecord,
        IntervalIndex, SambambaCommand, SampleAggregate,
    };
    pub use crate::model::{ExonIds, Sample, Thresholds, Transcript, TranscriptStat};
    pub use crate::pipeline::{
        load_sample, BatchLoader, DepthSource, LoadSummary, SampleError, SampleJob, SampleReport,
        Stage,
    };
    pub use crate::store::{CoverageStore, SampleSummary};
}
