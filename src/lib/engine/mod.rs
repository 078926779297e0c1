//! Coverage engine: interval index, depth readers, aggregation and the
//! external depth tool.

pub mod aggregator;
pub mod depth;
pub mod index;
pub mod sambamba;

pub use aggregator::{aggregate, AggregationSettings, CoverageAggregator, SampleAggregate};
pub use depth::{Coverage, DepthFormat, DepthReader, DepthRecord};
pub use index::{IntervalIndex, Span, TranscriptEntry};
pub use sambamba::{SambambaCommand, SambambaProcess};
