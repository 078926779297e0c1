//! Streaming roll-up of depth records into per-transcript statistics.
//!
//! A single pass over the depth stream keeps one accumulator per transcript
//! seen so far. Regions of a transcript may appear anywhere in the stream, so
//! accumulators stay open until the stream ends.
//!
//! Each base of a transcript is owned by exactly one exon (see
//! [`ExonSpan::owned`](crate::engine::index::ExonSpan)), which keeps
//! overlapping exons from counting the same base twice.

mod accumulator;

use log::debug;
use rustc_hash::FxHashMap;

use crate::core::config::Settings;
use crate::core::diagnostics::{Diagnostic, DiagnosticSink};
use crate::core::error::{CoverageError, Result};
use crate::engine::depth::DepthRecord;
use crate::engine::index::IntervalIndex;
use crate::model::{Thresholds, TranscriptStat, DEFAULT_PRIMARY_THRESHOLD};

use accumulator::TranscriptAccumulator;

/// Thresholds to compute and the one that decides exon incompleteness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSettings {
    thresholds: Thresholds,
    primary: u32,
}

impl AggregationSettings {
    /// `primary` must be one of `thresholds`.
    pub fn new(thresholds: Thresholds, primary: u32) -> Result<Self> {
        if !thresholds.contains(primary) {
            return Err(CoverageError::Config(format!(
                "primary threshold {} is not among the configured thresholds ({})",
                primary, thresholds
            )));
        }
        Ok(Self {
            thresholds,
            primary,
        })
    }

    #[inline]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    #[inline]
    pub fn primary(&self) -> u32 {
        self.primary
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            primary: DEFAULT_PRIMARY_THRESHOLD,
        }
    }
}

impl From<&Settings> for AggregationSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            thresholds: settings.thresholds.clone(),
            primary: settings.primary_threshold,
        }
    }
}

/// Aggregation state for one sample.
pub struct CoverageAggregator<'a> {
    index: &'a IntervalIndex,
    settings: &'a AggregationSettings,
    in_flight: FxHashMap<usize, TranscriptAccumulator>,
    records: usize,
    unknown: usize,
}

impl<'a> CoverageAggregator<'a> {
    pub fn new(index: &'a IntervalIndex, settings: &'a AggregationSettings) -> Self {
        Self {
            index,
            settings,
            in_flight: FxHashMap::default(),
            records: 0,
            unknown: 0,
        }
    }

    /// Attribute one record to its transcript. Unknown regions are reported
    /// to `sink` and skipped.
    pub fn add(&mut self, record: &DepthRecord, sink: &mut dyn DiagnosticSink) -> Result<()> {
        self.records += 1;
        let region = match self.index.region(&record.region_id) {
            Some(region) => region,
            None => {
                self.unknown += 1;
                sink.report(Diagnostic::UnknownRegion {
                    region_id: record.region_id.to_string(),
                });
                return Ok(());
            }
        };

        let entry = self.index.entry(region.transcript);
        let thresholds = self.settings.thresholds.len();
        let acc = self
            .in_flight
            .entry(region.transcript)
            .or_insert_with(|| TranscriptAccumulator::new(thresholds, entry.exons.len()));
        acc.add(
            record,
            region.exon,
            &entry.exons[region.exon],
            &self.settings.thresholds,
            self.settings.primary,
        )
    }

    /// Records seen so far, including unknown ones.
    #[inline]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Transcripts with at least one record.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Finalize every open accumulator. Stats come out in annotation order.
    pub fn finish(self, sample_id: &str) -> Vec<TranscriptStat> {
        let mut open: Vec<(usize, TranscriptAccumulator)> = self.in_flight.into_iter().collect();
        open.sort_unstable_by_key(|(idx, _)| *idx);
        debug!(
            "Sample {}: {} records, {} unknown, {} transcripts",
            sample_id,
            self.records,
            self.unknown,
            open.len()
        );

        open.into_iter()
            .map(|(idx, acc)| {
                acc.finish(
                    sample_id,
                    self.index.entry(idx),
                    &self.settings.thresholds,
                    self.settings.primary,
                )
            })
            .collect()
    }
}

/// Outcome of aggregating one sample's depth stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleAggregate {
    /// Records read, including unknown regions.
    pub records: usize,
    /// One stat per transcript with at least one record, in annotation order.
    pub stats: Vec<TranscriptStat>,
}

/// Consume a whole depth stream for `sample_id`.
///
/// The first error from the stream or from a record aborts the sample and no
/// stats are returned.
pub fn aggregate<I>(
    index: &IntervalIndex,
    settings: &AggregationSettings,
    sample_id: &str,
    records: I,
    sink: &mut dyn DiagnosticSink,
) -> Result<SampleAggregate>
where
    I: IntoIterator<Item = Result<DepthRecord>>,
{
    let mut aggregator = CoverageAggregator::new(index, settings);
    for record in records {
        aggregator.add(&record?, sink)?;
    }
    let records = aggregator.records();
    Ok(SampleAggregate {
        records,
        stats: aggregator.finish(sample_id),
    })
}
