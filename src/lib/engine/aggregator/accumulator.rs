use smallvec::{smallvec, SmallVec};
use std::collections::BTreeMap;

use crate::core::error::{CoverageError, Result};
use crate::engine::depth::DepthRecord;
use crate::engine::index::{ExonSpan, Span, TranscriptEntry};
use crate::model::{ExonIds, Thresholds, TranscriptStat};

/// Per-exon completeness below this is considered incomplete.
const COMPLETE: f64 = 1.0 - 1e-9;

/// Running sums for one transcript of one sample.
#[derive(Debug, Clone)]
pub(crate) struct TranscriptAccumulator {
    /// Sum of depth over owned transcript bases.
    depth_sum: f64,
    /// Bases reaching each configured threshold, parallel to the thresholds.
    pass: SmallVec<[f64; 8]>,
    /// Bases of each exon reaching the primary threshold.
    exon_pass: SmallVec<[f64; 16]>,
    /// Bases of each exon already accounted for, sorted and disjoint.
    seen: Vec<SmallVec<[Span; 2]>>,
}

impl TranscriptAccumulator {
    pub(crate) fn new(thresholds: usize, exons: usize) -> Self {
        Self {
            depth_sum: 0.0,
            pass: smallvec![0.0; thresholds],
            exon_pass: smallvec![0.0; exons],
            seen: vec![SmallVec::new(); exons],
        }
    }

    /// Add one record observed on `exon` (at `exon_idx` in its transcript).
    ///
    /// Only bases of the exon not covered by an earlier record of the same
    /// exon count, so a region reported twice is counted once.
    pub(crate) fn add(
        &mut self,
        record: &DepthRecord,
        exon_idx: usize,
        exon: &ExonSpan,
        thresholds: &Thresholds,
        primary: u32,
    ) -> Result<()> {
        let fractions = thresholds
            .iter()
            .map(|threshold| fraction(record, threshold))
            .collect::<Result<SmallVec<[f64; 8]>>>()?;
        let primary_fraction = fraction(record, primary)?;

        let on_exon = Span::new(
            record.span.start.max(exon.span.start),
            record.span.end.min(exon.span.end),
        );
        if on_exon.is_empty() {
            return Ok(());
        }

        for fresh in claim(&mut self.seen[exon_idx], on_exon) {
            let owned = exon.owned.map(|span| fresh.overlap(span) as f64).unwrap_or(0.0);
            for (slot, fraction) in self.pass.iter_mut().zip(fractions.iter()) {
                *slot += fraction * owned;
            }
            self.depth_sum += record.coverage.mean() * owned;
            self.exon_pass[exon_idx] += primary_fraction * fresh.len() as f64;
        }
        Ok(())
    }

    /// Turn the running sums into a stat row.
    pub(crate) fn finish(
        self,
        sample_id: &str,
        entry: &TranscriptEntry,
        thresholds: &Thresholds,
        primary: u32,
    ) -> TranscriptStat {
        let length = entry.length();
        let defined = length > 0;

        let mean_coverage = defined.then(|| self.depth_sum / length as f64);

        let completeness: BTreeMap<u32, Option<f64>> = thresholds
            .iter()
            .zip(self.pass.iter())
            .map(|(threshold, pass)| {
                let value = match (defined, threshold) {
                    (false, _) => None,
                    (true, 0) => Some(1.0),
                    (true, _) => Some((pass / length as f64).min(1.0)),
                };
                (threshold, value)
            })
            .collect();

        let mut incomplete_exons = ExonIds::new();
        if primary > 0 {
            for (exon, pass) in entry.exons.iter().zip(self.exon_pass.iter()) {
                if exon.span.is_empty() {
                    continue;
                }
                if pass / (exon.span.len() as f64) < COMPLETE {
                    incomplete_exons.insert(exon.exon_id.as_str());
                }
            }
        }

        TranscriptStat {
            sample_id: sample_id.to_string(),
            transcript_id: entry.id().to_string(),
            mean_coverage,
            completeness,
            threshold: primary,
            incomplete_exons,
        }
    }
}

fn fraction(record: &DepthRecord, threshold: u32) -> Result<f64> {
    record
        .coverage
        .fraction_at(threshold)
        .ok_or_else(|| CoverageError::MissingThreshold {
            region_id: record.region_id.to_string(),
            threshold,
        })
}

/// Mark `span` as seen and return the parts of it that were not seen before.
fn claim(seen: &mut SmallVec<[Span; 2]>, span: Span) -> SmallVec<[Span; 2]> {
    let mut fresh: SmallVec<[Span; 2]> = SmallVec::new();
    let mut cursor = span.start;
    for done in seen.iter() {
        if done.end <= cursor {
            continue;
        }
        if done.start >= span.end {
            break;
        }
        if done.start > cursor {
            fresh.push(Span::new(cursor, done.start));
        }
        cursor = cursor.max(done.end);
    }
    if cursor < span.end {
        fresh.push(Span::new(cursor, span.end));
    }
    if fresh.is_empty() {
        return fresh;
    }

    seen.extend(fresh.iter().copied());
    seen.sort_unstable();
    let mut merged: SmallVec<[Span; 2]> = SmallVec::with_capacity(seen.len());
    for next in seen.drain(..) {
        match merged.last_mut() {
            Some(last) if next.start <= last.end => last.end = last.end.max(next.end),
            _ => merged.push(next),
        }
    }
    *seen = merged;
    fresh
}
