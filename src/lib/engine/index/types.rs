use crate::model::Transcript;

/// Half-open genomic interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    #[inline]
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn len(self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// Number of bases shared with `other`.
    #[inline]
    pub fn overlap(self, other: Span) -> u64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end.saturating_sub(start)
    }
}

/// An exon as stored in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExonSpan {
    pub exon_id: String,
    pub span: Span,
    /// Bases of this exon not already covered by an earlier exon of the same
    /// transcript (exons ordered by start, end, id). Always contiguous.
    pub owned: Option<Span>,
}

/// A transcript with its merged, non-overlapping exon bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub transcript: Transcript,
    /// Merged exon intervals in ascending order.
    pub merged: Vec<Span>,
    /// Exons in genomic order.
    pub exons: Vec<ExonSpan>,
}

impl TranscriptEntry {
    #[inline]
    pub fn id(&self) -> &str {
        &self.transcript.id
    }

    #[inline]
    pub fn length(&self) -> u64 {
        self.transcript.length
    }
}

/// Location of a region id inside the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionRef {
    pub transcript: usize,
    pub exon: usize,
}
