//! Non-fatal findings raised while indexing annotation or aggregating depth.
//!
//! Core components never talk to a global logger directly about recoverable
//! problems. They push a [`Diagnostic`] into the [`DiagnosticSink`] handed to
//! them, and the caller decides what to do with the collected report.

use log::warn;
use std::fmt;

use super::error::CoverageError;

/// Number of unknown region ids kept verbatim in a report.
pub const UNKNOWN_REGION_SAMPLE: usize = 10;

/// A recoverable problem found while building the index or aggregating.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Exon with `start == end`; dropped from the merged interval set.
    ZeroLengthExon {
        exon_id: String,
        transcript_id: String,
    },
    /// Exon row without a transcript id; excluded from the index.
    MissingTranscript { exon_id: String },
    /// Transcript excluded from the index because of bad exon coordinates,
    /// conflicting contigs/genes, or an exon claimed by another transcript.
    MalformedInterval {
        transcript_id: String,
        reason: String,
    },
    /// Depth record for a region id absent from the index.
    UnknownRegion { region_id: String },
}

impl Diagnostic {
    /// Convert a [`CoverageError::MalformedInterval`] into its diagnostic form.
    pub fn from_malformed(err: CoverageError) -> Option<Self> {
        match err {
            CoverageError::MalformedInterval {
                transcript_id,
                reason,
            } => Some(Diagnostic::MalformedInterval {
                transcript_id,
                reason,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ZeroLengthExon {
                exon_id,
                transcript_id,
            } => write!(
                f,
                "zero-length exon {} on transcript {} dropped",
                exon_id, transcript_id
            ),
            Diagnostic::MissingTranscript { exon_id } => {
                write!(f, "exon {} has no transcript id, skipped", exon_id)
            }
            Diagnostic::MalformedInterval {
                transcript_id,
                reason,
            } => write!(
                f,
                "transcript {} excluded: malformed interval ({})",
                transcript_id, reason
            ),
            Diagnostic::UnknownRegion { region_id } => {
                write!(f, "unknown region {} skipped", region_id)
            }
        }
    }
}

/// Receiver for [`Diagnostic`]s.
///
/// Implementations must be cheap to call per record: the aggregator reports
/// every unknown region it sees.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Sink that drops everything. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    #[inline]
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Default collector: counts every diagnostic kind, keeps the structural ones,
/// and echoes them through `log::warn!`.
///
/// Unknown regions are only counted (plus a small sample of ids) because a
/// mismatched region file can produce one per line.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DiagnosticReport {
    pub zero_length_exons: Vec<(String, String)>,
    pub skipped_exons: Vec<String>,
    pub malformed: Vec<(String, String)>,
    pub unknown_regions: usize,
    pub unknown_region_sample: Vec<String>,
    quiet: bool,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A report that collects without logging.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    /// Total number of diagnostics received.
    pub fn len(&self) -> usize {
        self.zero_length_exons.len()
            + self.skipped_exons.len()
            + self.malformed.len()
            + self.unknown_regions
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transcript ids excluded from the index.
    pub fn malformed_transcripts(&self) -> impl Iterator<Item = &str> {
        self.malformed.iter().map(|(id, _)| id.as_str())
    }

    /// Fold another report into this one.
    pub fn absorb(&mut self, other: DiagnosticReport) {
        self.zero_length_exons.extend(other.zero_length_exons);
        self.skipped_exons.extend(other.skipped_exons);
        self.malformed.extend(other.malformed);
        self.unknown_regions += other.unknown_regions;
        for id in other.unknown_region_sample {
            if self.unknown_region_sample.len() >= UNKNOWN_REGION_SAMPLE {
                break;
            }
            self.unknown_region_sample.push(id);
        }
    }

    /// One-line summary for the end of a run.
    pub fn summary(&self) -> String {
        format!(
            "{} zero-length exons, {} exons without transcript, {} malformed transcripts, {} unknown regions",
            self.zero_length_exons.len(),
            self.skipped_exons.len(),
            self.malformed.len(),
            self.unknown_regions
        )
    }
}

impl DiagnosticSink for DiagnosticReport {
    fn report(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::UnknownRegion { region_id } => {
                self.unknown_regions += 1;
                if self.unknown_region_sample.len() < UNKNOWN_REGION_SAMPLE {
                    self.unknown_region_sample.push(region_id.clone());
                    if !self.quiet {
                        warn!("{}", diagnostic);
                    }
                }
                return;
            }
            Diagnostic::ZeroLengthExon {
                exon_id,
                transcript_id,
            } => self
                .zero_length_exons
                .push((exon_id.clone(), transcript_id.clone())),
            Diagnostic::MissingTranscript { exon_id } => self.skipped_exons.push(exon_id.clone()),
            Diagnostic::MalformedInterval {
                transcript_id,
                reason,
            } => self.malformed.push((transcript_id.clone(), reason.clone())),
        }
        if !self.quiet {
            warn!("{}", diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_unknown_regions_but_samples_only_a_few() {
        let mut report = DiagnosticReport::quiet();
        for i in 0..(UNKNOWN_REGION_SAMPLE + 5) {
            report.report(Diagnostic::UnknownRegion {
                region_id: format!("EXON_{}", i),
            });
        }
        assert_eq!(report.unknown_regions, UNKNOWN_REGION_SAMPLE + 5);
        assert_eq!(report.unknown_region_sample.len(), UNKNOWN_REGION_SAMPLE);
        assert_eq!(report.unknown_region_sample[0], "EXON_0");
    }

    #[test]
    fn keeps_structural_findings() {
        let mut report = DiagnosticReport::quiet();
        report.report(Diagnostic::MissingTranscript {
            exon_id: "e1".into(),
        });
        report.report(Diagnostic::MalformedInterval {
            transcript_id: "T9".into(),
            reason: "start > end".into(),
        });
        assert_eq!(report.skipped_exons, vec!["e1".to_string()]);
        assert_eq!(report.malformed_transcripts().collect::<Vec<_>>(), vec!["T9"]);
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn absorb_merges_counts() {
        let mut a = DiagnosticReport::quiet();
        a.report(Diagnostic::UnknownRegion {
            region_id: "x".into(),
        });
        let mut b = DiagnosticReport::quiet();
        b.report(Diagnostic::UnknownRegion {
            region_id: "y".into(),
        });
        b.report(Diagnostic::MissingTranscript {
            exon_id: "e".into(),
        });
        a.absorb(b);
        assert_eq!(a.unknown_regions, 2);
        assert_eq!(a.unknown_region_sample, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(a.skipped_exons.len(), 1);
    }

    #[test]
    fn converts_malformed_error() {
        let err = CoverageError::MalformedInterval {
            transcript_id: "T1".into(),
            reason: "start 5 > end 2".into(),
        };
        assert_eq!(
            Diagnostic::from_malformed(err),
            Some(Diagnostic::MalformedInterval {
                transcript_id: "T1".into(),
                reason: "start 5 > end 2".into()
            })
        );
        assert_eq!(
            Diagnostic::from_malformed(CoverageError::Parse("x".into())),
            None
        );
    }
}
