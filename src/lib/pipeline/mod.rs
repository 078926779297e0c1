//! Sample loading: depth source -> aggregation -> store, for one sample or
//! a batch of samples in parallel.

pub mod batch;
pub mod sample;

pub use batch::{BatchLoader, SampleReport};
pub use sample::{load_sample, DepthSource, LoadSummary, SampleError, SampleJob, Stage};
