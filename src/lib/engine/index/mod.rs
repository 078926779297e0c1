//! Interval index: exon annotation grouped into transcripts.
//!
//! Every transcript is reduced to its set of merged exon intervals, which
//! defines its length. Region ids (exon ids) resolve back to the transcript
//! and exon they belong to so depth records can be attributed in one lookup.
//!
//! Problems with individual transcripts never abort the build. They are
//! reported to the [`DiagnosticSink`] and the transcript is left out.

mod intervals;
pub mod types;

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;

use crate::annotation::{read_exons, AnnotatedExon};
use crate::core::diagnostics::{Diagnostic, DiagnosticSink};
use crate::core::error::{CoverageError, Result};
use crate::model::Transcript;

pub use types::{ExonSpan, RegionRef, Span, TranscriptEntry};

use intervals::{covered_bases, merge_spans, owned_spans};

/// Exon row after it has been assigned to exactly one transcript.
#[derive(Debug, Clone)]
struct PendingExon {
    exon_id: String,
    chrom: String,
    start: u64,
    end: u64,
    gene_id: Option<String>,
}

/// Read-only lookup from region ids to transcripts. Immutable once built and
/// safe to share between worker threads.
#[derive(Debug, Default, Clone)]
pub struct IntervalIndex {
    entries: Vec<TranscriptEntry>,
    by_transcript: FxHashMap<String, usize>,
    regions: FxHashMap<String, RegionRef>,
}

impl IntervalIndex {
    /// Build the index from annotated exons.
    pub fn build<I>(exons: I, sink: &mut dyn DiagnosticSink) -> Self
    where
        I: IntoIterator<Item = AnnotatedExon>,
    {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: FxHashMap<String, Vec<PendingExon>> = FxHashMap::default();
        let mut claims: FxHashMap<String, Vec<String>> = FxHashMap::default();

        for exon in exons {
            if exon.transcript_ids.is_empty() {
                sink.report(Diagnostic::MissingTranscript {
                    exon_id: exon.exon_id,
                });
                continue;
            }

            for tx in &exon.transcript_ids {
                let claimers = claims.entry(exon.exon_id.clone()).or_default();
                if !claimers.contains(tx) {
                    claimers.push(tx.clone());
                }

                let group = grouped.entry(tx.clone()).or_insert_with(|| {
                    order.push(tx.clone());
                    Vec::new()
                });
                group.push(PendingExon {
                    exon_id: exon.exon_id.clone(),
                    chrom: exon.chrom.clone(),
                    start: exon.start,
                    end: exon.end,
                    gene_id: exon.gene_id.clone(),
                });
            }
        }

        // Region ids must resolve to a single transcript.
        let mut conflicts: FxHashMap<String, String> = FxHashMap::default();
        for (exon_id, claimers) in claims.iter().filter(|(_, c)| c.len() > 1) {
            for tx in claimers {
                conflicts.entry(tx.clone()).or_insert_with(|| {
                    format!("exon {} is also claimed by {}", exon_id, claimers.join(","))
                });
            }
        }

        let mut index = IntervalIndex::default();
        for tx in order {
            let exons = grouped.remove(&tx).unwrap_or_default();
            let built = match conflicts.remove(&tx) {
                Some(reason) => Err(CoverageError::MalformedInterval {
                    transcript_id: tx.clone(),
                    reason,
                }),
                None => index_transcript(&tx, exons, sink),
            };

            match built {
                Ok(entry) => index.insert(entry),
                Err(err) => {
                    if let Some(diagnostic) = Diagnostic::from_malformed(err) {
                        sink.report(diagnostic);
                    }
                }
            }
        }

        debug!(
            "Indexed {} transcripts covering {} regions",
            index.entries.len(),
            index.regions.len()
        );
        index
    }

    /// Read an annotation file and build the index from it.
    pub fn from_path<P: AsRef<Path>>(path: P, sink: &mut dyn DiagnosticSink) -> Result<Self> {
        let exons = read_exons(path.as_ref())?;
        let index = Self::build(exons, sink);
        info!(
            "Loaded {} transcripts from {}",
            index.len(),
            path.as_ref().display()
        );
        Ok(index)
    }

    fn insert(&mut self, entry: TranscriptEntry) {
        let idx = self.entries.len();
        for (exon_idx, exon) in entry.exons.iter().enumerate() {
            self.regions.insert(
                exon.exon_id.clone(),
                RegionRef {
                    transcript: idx,
                    exon: exon_idx,
                },
            );
        }
        self.by_transcript.insert(entry.transcript.id.clone(), idx);
        self.entries.push(entry);
    }

    /// Number of indexed transcripts.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of resolvable region ids.
    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Resolve a region id.
    #[inline]
    pub fn region(&self, region_id: &str) -> Option<RegionRef> {
        self.regions.get(region_id).copied()
    }

    #[inline]
    pub fn entry(&self, idx: usize) -> &TranscriptEntry {
        &self.entries[idx]
    }

    #[inline]
    pub fn exon(&self, region: RegionRef) -> &ExonSpan {
        &self.entries[region.transcript].exons[region.exon]
    }

    pub fn transcript(&self, transcript_id: &str) -> Option<&TranscriptEntry> {
        self.by_transcript
            .get(transcript_id)
            .map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    /// Transcript rows in annotation order, ready for the store.
    pub fn transcripts(&self) -> Vec<Transcript> {
        self.entries.iter().map(|e| e.transcript.clone()).collect()
    }
}

/// Validate and merge the exons of a single transcript.
fn index_transcript(
    transcript_id: &str,
    mut exons: Vec<PendingExon>,
    sink: &mut dyn DiagnosticSink,
) -> Result<TranscriptEntry> {
    let malformed = |reason: String| CoverageError::MalformedInterval {
        transcript_id: transcript_id.to_string(),
        reason,
    };

    let first = match exons.first() {
        Some(first) => first,
        None => return Err(malformed("no exons".to_string())),
    };
    let chrom = first.chrom.clone();

    let mut gene: Option<String> = None;
    for exon in &exons {
        if exon.start > exon.end {
            return Err(malformed(format!(
                "exon {} has start {} after end {}",
                exon.exon_id, exon.start, exon.end
            )));
        }
        if exon.chrom != chrom {
            return Err(malformed(format!(
                "exons on both {} and {}",
                chrom, exon.chrom
            )));
        }
        match (&gene, &exon.gene_id) {
            (None, Some(g)) => gene = Some(g.clone()),
            (Some(current), Some(g)) if current != g => {
                return Err(malformed(format!("exons in both {} and {}", current, g)));
            }
            _ => {}
        }
    }
    let gene = gene.ok_or_else(|| malformed("no gene id".to_string()))?;

    exons.sort_by(|a, b| {
        (a.start, a.end, &a.exon_id).cmp(&(b.start, b.end, &b.exon_id))
    });

    // The same exon listed twice is fine, with different coordinates it is not.
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut unique: Vec<&PendingExon> = Vec::with_capacity(exons.len());
    for exon in &exons {
        if seen.insert(exon.exon_id.as_str()) {
            unique.push(exon);
        } else if !unique
            .iter()
            .any(|u| u.exon_id == exon.exon_id && u.start == exon.start && u.end == exon.end)
        {
            return Err(malformed(format!(
                "exon {} listed with conflicting coordinates",
                exon.exon_id
            )));
        }
    }

    let spans: Vec<Span> = unique.iter().map(|e| Span::new(e.start, e.end)).collect();
    let owned = owned_spans(&spans);
    let merged = merge_spans(&spans);
    let length = covered_bases(&merged);

    let exon_spans = unique
        .iter()
        .zip(spans.iter().zip(owned))
        .map(|(exon, (&span, owned))| {
            if span.is_empty() {
                sink.report(Diagnostic::ZeroLengthExon {
                    exon_id: exon.exon_id.clone(),
                    transcript_id: transcript_id.to_string(),
                });
            }
            ExonSpan {
                exon_id: exon.exon_id.clone(),
                span,
                owned,
            }
        })
        .collect();

    Ok(TranscriptEntry {
        transcript: Transcript::new(transcript_id, gene, chrom, length),
        merged,
        exons: exon_spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::DiagnosticReport;

    fn exon(id: &str, start: u64, end: u64, tx: &str) -> AnnotatedExon {
        AnnotatedExon::new(id, "1", start, end, tx, "GENE1")
    }

    #[test]
    fn overlapping_exons_merge() {
        let mut report = DiagnosticReport::quiet();
        let index = IntervalIndex::build(
            vec![exon("e1", 100, 150, "T1"), exon("e2", 140, 200, "T1")],
            &mut report,
        );

        let t1 = index.transcript("T1").unwrap();
        assert_eq!(t1.length(), 100);
        assert_eq!(t1.merged, vec![Span::new(100, 200)]);
        assert_eq!(t1.transcript.gene_id, "GENE1");
        assert_eq!(t1.transcript.chromosome, "1");

        let e2 = index.exon(index.region("e2").unwrap());
        assert_eq!(e2.owned, Some(Span::new(150, 200)));
        assert!(report.is_empty());
    }

    #[test]
    fn exons_resolve_to_their_transcript() {
        let index = IntervalIndex::build(
            vec![
                exon("e1", 0, 10, "T1"),
                exon("e2", 20, 30, "T1"),
                exon("e3", 5, 15, "T2"),
            ],
            &mut DiagnosticReport::quiet(),
        );
        assert_eq!(index.len(), 2);
        assert_eq!(index.region_count(), 3);
        let r = index.region("e3").unwrap();
        assert_eq!(index.entry(r.transcript).id(), "T2");
        assert_eq!(index.transcript("T1").unwrap().length(), 20);
        assert!(index.region("missing").is_none());
    }

    #[test]
    fn zero_length_exon_is_reported_and_ignored() {
        let mut report = DiagnosticReport::quiet();
        let index = IntervalIndex::build(
            vec![exon("e1", 100, 150, "T1"), exon("e0", 120, 120, "T1")],
            &mut report,
        );
        let t1 = index.transcript("T1").unwrap();
        assert_eq!(t1.length(), 50);
        assert_eq!(
            report.zero_length_exons,
            vec![("e0".to_string(), "T1".to_string())]
        );
        let e0 = index.exon(index.region("e0").unwrap());
        assert_eq!(e0.owned, None);
    }

    #[test]
    fn inverted_exon_excludes_transcript() {
        let mut report = DiagnosticReport::quiet();
        let index = IntervalIndex::build(
            vec![exon("e1", 200, 150, "T1"), exon("e2", 10, 20, "T2")],
            &mut report,
        );
        assert!(index.transcript("T1").is_none());
        assert!(index.region("e1").is_none());
        assert!(index.transcript("T2").is_some());
        assert_eq!(report.malformed_transcripts().collect::<Vec<_>>(), vec!["T1"]);
    }

    #[test]
    fn exon_without_transcript_is_skipped() {
        let mut report = DiagnosticReport::quiet();
        let mut orphan = exon("e9", 0, 10, "T1");
        orphan.transcript_ids.clear();
        let index = IntervalIndex::build(vec![orphan, exon("e1", 0, 10, "T1")], &mut report);
        assert_eq!(index.len(), 1);
        assert_eq!(report.skipped_exons, vec!["e9".to_string()]);
    }

    #[test]
    fn shared_exon_marks_claimants_malformed() {
        let mut report = DiagnosticReport::quiet();
        let mut shared = exon("e1", 0, 10, "T1");
        shared.transcript_ids.push("T2".to_string());
        let index = IntervalIndex::build(
            vec![shared, exon("e2", 20, 30, "T2"), exon("e3", 40, 50, "T3")],
            &mut report,
        );
        assert_eq!(index.len(), 1);
        assert!(index.transcript("T3").is_some());
        let mut bad: Vec<&str> = report.malformed_transcripts().collect();
        bad.sort_unstable();
        assert_eq!(bad, vec!["T1", "T2"]);
    }

    #[test]
    fn mixed_contigs_or_genes_are_malformed() {
        let mut report = DiagnosticReport::quiet();
        let other_chrom = AnnotatedExon::new("e2", "2", 20, 30, "T1", "GENE1");
        let other_gene = AnnotatedExon::new("e4", "1", 20, 30, "T2", "GENE2");
        let index = IntervalIndex::build(
            vec![
                exon("e1", 0, 10, "T1"),
                other_chrom,
                exon("e3", 0, 10, "T2"),
                other_gene,
            ],
            &mut report,
        );
        assert!(index.is_empty());
        assert_eq!(report.malformed.len(), 2);
    }

    #[test]
    fn repeated_identical_exon_is_tolerated() {
        let index = IntervalIndex::build(
            vec![exon("e1", 0, 10, "T1"), exon("e1", 0, 10, "T1")],
            &mut DiagnosticReport::quiet(),
        );
        let t1 = index.transcript("T1").unwrap();
        assert_eq!(t1.exons.len(), 1);
        assert_eq!(t1.length(), 10);
    }

    #[test]
    fn transcripts_keep_annotation_order() {
        let index = IntervalIndex::build(
            vec![
                exon("a", 0, 10, "TX_B"),
                exon("b", 0, 10, "TX_A"),
                exon("c", 20, 25, "TX_B"),
            ],
            &mut DiagnosticReport::quiet(),
        );
        let ids: Vec<String> = index.transcripts().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["TX_B".to_string(), "TX_A".to_string()]);
    }
}
